//! Steam-table loading and the combined table store.
//!
//! The external format is tab-separated with one header row and columns
//! `(P_MPa, T_C, v_m3kg, u_kJkg, h_kJkg, s_kJkgK, phase_label, rho_kgm3)`.
//! Rows labeled `saturated liquid` / `saturated vapor` form the
//! saturation sequence; every other label is treated as single-phase.
//! Internally everything is SI: Pa, K, J/kg, m3/kg.

use std::path::Path;

use tracing::error;

use crate::error::{SteamError, SteamResult};
use crate::fallback::FallbackSaturation;
use crate::mesh::SinglePhaseMesh;
use crate::saturation::SaturationTable;

/// Built-in table generated offline from IAPWS-IF97.
const BUILTIN_TSV: &str = include_str!("../data/water_steam.tsv");

/// Phase classification of a single-phase table row, used as a vertex
/// hint by the interpolation mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinglePhaseKind {
    Liquid,
    Vapor,
    /// Supercritical or unrecognized label. Never agrees with its
    /// neighbors, which routes interpolation to the supercritical path.
    Other,
}

/// How a raw table row is classified while loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowLabel {
    SaturatedLiquid,
    SaturatedVapor,
    SinglePhase(SinglePhaseKind),
}

/// One parsed table row, in SI units.
#[derive(Clone, Debug)]
pub struct SteamRow {
    pub p_pa: f64,
    pub t_k: f64,
    pub v_m3_kg: f64,
    pub u_j_kg: f64,
    pub h_j_kg: f64,
    pub s_j_kg_k: f64,
    pub rho_kg_m3: f64,
    pub label: RowLabel,
}

fn parse_label(label: &str) -> RowLabel {
    let l = label.trim().to_ascii_lowercase();
    match l.as_str() {
        "saturated liquid" => RowLabel::SaturatedLiquid,
        "saturated vapor" => RowLabel::SaturatedVapor,
        _ if l.contains("liquid") => RowLabel::SinglePhase(SinglePhaseKind::Liquid),
        _ if l.contains("vapor") || l.contains("steam") => {
            RowLabel::SinglePhase(SinglePhaseKind::Vapor)
        }
        _ => RowLabel::SinglePhase(SinglePhaseKind::Other),
    }
}

fn parse_field(field: &str, line: usize, what: &str) -> SteamResult<f64> {
    let value: f64 = field.trim().parse().map_err(|_| SteamError::TableParse {
        line,
        message: format!("cannot parse {what} from {field:?}"),
    })?;
    if !value.is_finite() {
        return Err(SteamError::TableParse {
            line,
            message: format!("{what} is not finite: {field:?}"),
        });
    }
    Ok(value)
}

/// Parse the whole TSV body into rows. Line numbers are 1-based and
/// include the header.
pub fn parse_tsv(text: &str) -> SteamResult<Vec<SteamRow>> {
    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if idx == 0 {
            // header
            continue;
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() != 8 {
            return Err(SteamError::TableParse {
                line,
                message: format!("expected 8 tab-separated fields, got {}", fields.len()),
            });
        }
        let p_mpa = parse_field(fields[0], line, "P_MPa")?;
        let t_c = parse_field(fields[1], line, "T_C")?;
        let v = parse_field(fields[2], line, "v_m3kg")?;
        let u = parse_field(fields[3], line, "u_kJkg")?;
        let h = parse_field(fields[4], line, "h_kJkg")?;
        let s = parse_field(fields[5], line, "s_kJkgK")?;
        let label = parse_label(fields[6]);
        let rho = parse_field(fields[7], line, "rho_kgm3")?;
        if v <= 0.0 || rho <= 0.0 || p_mpa <= 0.0 {
            return Err(SteamError::TableParse {
                line,
                message: "pressure, specific volume and density must be positive".into(),
            });
        }
        rows.push(SteamRow {
            p_pa: p_mpa * 1.0e6,
            t_k: t_c + 273.15,
            v_m3_kg: v,
            u_j_kg: u * 1.0e3,
            h_j_kg: h * 1.0e3,
            s_j_kg_k: s * 1.0e3,
            rho_kg_m3: rho,
            label,
        });
    }
    if rows.is_empty() {
        return Err(SteamError::TableInvalid {
            what: "table contains no data rows",
        });
    }
    Ok(rows)
}

/// Immutable store owning the saturation sequence, the dome polygon and
/// the single-phase interpolation mesh. Shared by reference across all
/// operators; nothing here mutates after construction.
pub struct SteamTableStore {
    saturation: SaturationTable,
    mesh: Option<SinglePhaseMesh>,
    degraded: bool,
}

impl SteamTableStore {
    /// Build a store from TSV text.
    pub fn from_tsv_str(text: &str) -> SteamResult<Self> {
        let rows = parse_tsv(text)?;
        let (sat_rows, single_rows): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .partition(|r| !matches!(r.label, RowLabel::SinglePhase(_)));
        let saturation = SaturationTable::from_rows(&sat_rows)?;
        let mesh = SinglePhaseMesh::from_rows(&single_rows)?;
        Ok(Self {
            saturation,
            mesh: Some(mesh),
            degraded: false,
        })
    }

    /// Build a store from a TSV file on disk.
    pub fn from_tsv_path(path: &Path) -> SteamResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_tsv_str(&text)
    }

    /// The built-in IAPWS-IF97 table.
    pub fn builtin() -> SteamResult<Self> {
        Self::from_tsv_str(BUILTIN_TSV)
    }

    /// Degraded store for when no table can be loaded: the saturation
    /// sequence is synthesized from Wagner-style correlations and there
    /// is no single-phase mesh. Single-phase lookups will fail with
    /// `MeshUnavailable`.
    pub fn degraded() -> SteamResult<Self> {
        error!(
            "steam table unavailable; falling back to Wagner saturation correlation \
             and analytic density approximations (single-phase interpolation disabled)"
        );
        let saturation = FallbackSaturation::default().synthesize_table()?;
        Ok(Self {
            saturation,
            mesh: None,
            degraded: true,
        })
    }

    pub fn saturation(&self) -> &SaturationTable {
        &self.saturation
    }

    pub fn mesh(&self) -> Option<&SinglePhaseMesh> {
        self.mesh.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}
