//! Delaunay-triangulated single-phase interpolation mesh.
//!
//! Vertices are the non-saturated table rows in transformed coordinates
//! (log10 v, u / 1e6), which puts both axes at O(1) spans. The
//! triangulation and half-edge adjacency are built once at load time;
//! point location walks triangles from a per-thread cached start (the
//! hint is advisory and never affects the result, only how fast it is
//! found).

use std::cell::Cell;

use delaunator::{triangulate, Point, EMPTY};

use crate::error::{SteamError, SteamResult};
use crate::table::{RowLabel, SinglePhaseKind, SteamRow};

/// One mesh vertex: transformed coordinates plus the values carried for
/// interpolation.
#[derive(Clone, Copy, Debug)]
struct MeshVertex {
    x: f64,
    y: f64,
    t_k: f64,
    p_pa: f64,
    kind: SinglePhaseKind,
}

/// Interpolation result at a located point.
#[derive(Clone, Copy, Debug)]
pub struct MeshSample {
    pub t_k: f64,
    pub p_pa: f64,
    /// Phase hints of the three surrounding vertices.
    pub kinds: [SinglePhaseKind; 3],
}

impl MeshSample {
    /// All three vertices agree on a phase hint.
    pub fn agreed_kind(&self) -> Option<SinglePhaseKind> {
        if self.kinds[0] == self.kinds[1]
            && self.kinds[1] == self.kinds[2]
            && self.kinds[0] != SinglePhaseKind::Other
        {
            Some(self.kinds[0])
        } else {
            None
        }
    }
}

pub struct SinglePhaseMesh {
    vertices: Vec<MeshVertex>,
    /// Vertex indices, three per triangle.
    triangles: Vec<usize>,
    /// Opposite half-edge per half-edge, `EMPTY` on the hull.
    halfedges: Vec<usize>,
    /// +1 if triangles wind counter-clockwise, -1 otherwise.
    orient_sign: f64,
}

thread_local! {
    // Advisory start triangle for the walking point locator.
    static LAST_TRIANGLE: Cell<usize> = const { Cell::new(0) };
}

#[inline]
fn transform(u_j_kg: f64, v_m3_kg: f64) -> (f64, f64) {
    (v_m3_kg.log10(), u_j_kg / 1.0e6)
}

#[inline]
fn cross(ax: f64, ay: f64, bx: f64, by: f64, px: f64, py: f64) -> f64 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

impl SinglePhaseMesh {
    pub fn from_rows(rows: &[SteamRow]) -> SteamResult<Self> {
        let mut vertices = Vec::with_capacity(rows.len());
        for r in rows {
            let kind = match r.label {
                RowLabel::SinglePhase(k) => k,
                _ => {
                    return Err(SteamError::TableInvalid {
                        what: "saturation row passed to single-phase mesh",
                    })
                }
            };
            let (x, y) = transform(r.u_j_kg, r.v_m3_kg);
            vertices.push(MeshVertex {
                x,
                y,
                t_k: r.t_k,
                p_pa: r.p_pa,
                kind,
            });
        }
        if vertices.len() < 3 {
            return Err(SteamError::TableInvalid {
                what: "too few single-phase rows to triangulate",
            });
        }

        let points: Vec<Point> = vertices.iter().map(|v| Point { x: v.x, y: v.y }).collect();
        let tri = triangulate(&points);
        if tri.triangles.is_empty() {
            return Err(SteamError::TableInvalid {
                what: "single-phase rows are degenerate (no triangulation)",
            });
        }

        // Determine winding from the first non-degenerate triangle so the
        // walk does not depend on the library's convention.
        let mut orient_sign = 0.0;
        for t in 0..tri.triangles.len() / 3 {
            let a = &vertices[tri.triangles[3 * t]];
            let b = &vertices[tri.triangles[3 * t + 1]];
            let c = &vertices[tri.triangles[3 * t + 2]];
            let area2 = cross(a.x, a.y, b.x, b.y, c.x, c.y);
            if area2.abs() > 1.0e-14 {
                orient_sign = area2.signum();
                break;
            }
        }
        if orient_sign == 0.0 {
            return Err(SteamError::TableInvalid {
                what: "all single-phase triangles are degenerate",
            });
        }

        Ok(Self {
            vertices,
            triangles: tri.triangles,
            halfedges: tri.halfedges,
            orient_sign,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    fn edge_endpoints(&self, e: usize) -> (usize, usize) {
        let next = if e % 3 == 2 { e - 2 } else { e + 1 };
        (self.triangles[e], self.triangles[next])
    }

    /// Walk from `start` toward the point; returns the containing
    /// triangle, or None when the point leaves the hull.
    fn walk(&self, start: usize, px: f64, py: f64) -> Option<usize> {
        let n_tri = self.triangle_count();
        let mut t = start.min(n_tri - 1);
        for _ in 0..n_tri {
            let mut crossed = false;
            for k in 0..3 {
                let e = 3 * t + k;
                let (ia, ib) = self.edge_endpoints(e);
                let a = &self.vertices[ia];
                let b = &self.vertices[ib];
                let side = self.orient_sign * cross(a.x, a.y, b.x, b.y, px, py);
                if side < -1.0e-14 {
                    match self.halfedges[e] {
                        EMPTY => return None,
                        opp => {
                            t = opp / 3;
                            crossed = true;
                            break;
                        }
                    }
                }
            }
            if !crossed {
                return Some(t);
            }
        }
        // Walk failed to settle (degenerate geometry); exhaustive scan.
        (0..n_tri).find(|&cand| self.contains(cand, px, py))
    }

    fn contains(&self, t: usize, px: f64, py: f64) -> bool {
        (0..3).all(|k| {
            let (ia, ib) = self.edge_endpoints(3 * t + k);
            let a = &self.vertices[ia];
            let b = &self.vertices[ib];
            self.orient_sign * cross(a.x, a.y, b.x, b.y, px, py) >= -1.0e-12
        })
    }

    /// Locate the triangle containing (u, v) and interpolate T and P by
    /// barycentric weights of the vertex values.
    pub fn sample(&self, u_j_kg: f64, v_m3_kg: f64) -> SteamResult<MeshSample> {
        let (px, py) = transform(u_j_kg, v_m3_kg);
        let start = LAST_TRIANGLE.with(|c| c.get());
        let t = self.walk(start, px, py).ok_or(SteamError::MeshMiss {
            u_j_kg,
            v_m3_kg,
        })?;
        LAST_TRIANGLE.with(|c| c.set(t));

        let ia = self.triangles[3 * t];
        let ib = self.triangles[3 * t + 1];
        let ic = self.triangles[3 * t + 2];
        let a = &self.vertices[ia];
        let b = &self.vertices[ib];
        let c = &self.vertices[ic];

        let area2 = cross(a.x, a.y, b.x, b.y, c.x, c.y);
        let wa = cross(b.x, b.y, c.x, c.y, px, py) / area2;
        let wb = cross(c.x, c.y, a.x, a.y, px, py) / area2;
        let wc = 1.0 - wa - wb;
        // Tiny negative weights happen at triangle edges; renormalize.
        let wa = wa.max(0.0);
        let wb = wb.max(0.0);
        let wc = wc.max(0.0);
        let sum = wa + wb + wc;
        let (wa, wb, wc) = (wa / sum, wb / sum, wc / sum);

        Ok(MeshSample {
            t_k: wa * a.t_k + wb * b.t_k + wc * c.t_k,
            p_pa: wa * a.p_pa + wb * b.p_pa + wc * c.p_pa,
            kinds: [a.kind, b.kind, c.kind],
        })
    }
}
