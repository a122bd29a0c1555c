//! Per-cell densification for finite element meshes
//!
//! The mesher and the field solver are capabilities behind the [MeshProvider]
//! and [FemSolver] traits. This crate ships a structured unit-square mesh and
//! a solver that applies the kinetic forward model cell by cell;
//! [UnavailableMesher] and [UnavailableFemSolver] stand in where an external
//! toolkit is not present.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::CELSIUS_TO_KELVIN;
use crate::error::SinterError;
use crate::kinetics::KineticParameters;
use crate::simulator::{integrate, SinteringLaw, SolverOptions, TemperatureProfile};

/// Anything that can report how many cells it holds
pub trait CellMesh: Send + Sync {
    fn num_cells(&self) -> usize;
}

/// Generates meshes of the unit square
pub trait MeshProvider {
    type Mesh: CellMesh;

    fn unit_square(&self, mesh_size: f64) -> Result<Self::Mesh, SinterError>;
}

/// Boundary data handed to a [FemSolver]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoundaryConditions {
    /// `(time_s, temperature_c)` pairs applied to the whole domain
    pub temperature_history: Vec<(f64, f64)>,
}

/// Field values produced by a [FemSolver], one density fraction per cell
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldOutput {
    pub density: Vec<f64>,
}

/// Runs a full simulation on a mesh
pub trait FemSolver {
    fn run_simulation(
        &self,
        mesh: &dyn CellMesh,
        material: &KineticParameters,
        boundary: &BoundaryConditions,
    ) -> Result<FieldOutput, SinterError>;
}

/// Structured triangulation of `[0, 1]²` with `n × n` squares split in two
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSquareMesh {
    divisions: usize,
}

impl UnitSquareMesh {
    /// `n = max(1, ⌊1 / mesh_size⌋)` divisions per side
    pub fn new(mesh_size: f64) -> Result<Self, SinterError> {
        if !(mesh_size.is_finite() && mesh_size > 0.0) {
            return Err(SinterError::invalid(format!(
                "mesh size must be positive and finite, got {}",
                mesh_size
            )));
        }
        let divisions = ((1.0 / mesh_size).floor() as usize).max(1);
        Ok(UnitSquareMesh { divisions })
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }
}

impl CellMesh for UnitSquareMesh {
    fn num_cells(&self) -> usize {
        2 * self.divisions * self.divisions
    }
}

/// Builds [UnitSquareMesh] meshes
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredMesher;

impl MeshProvider for StructuredMesher {
    type Mesh = UnitSquareMesh;

    fn unit_square(&self, mesh_size: f64) -> Result<Self::Mesh, SinterError> {
        UnitSquareMesh::new(mesh_size)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableMesher;

impl MeshProvider for UnavailableMesher {
    type Mesh = UnitSquareMesh;

    fn unit_square(&self, _mesh_size: f64) -> Result<Self::Mesh, SinterError> {
        Err(SinterError::Unavailable {
            capability: "mesh generation".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFemSolver;

impl FemSolver for UnavailableFemSolver {
    fn run_simulation(
        &self,
        _mesh: &dyn CellMesh,
        _material: &KineticParameters,
        _boundary: &BoundaryConditions,
    ) -> Result<FieldOutput, SinterError> {
        Err(SinterError::Unavailable {
            capability: "FEM solver".to_string(),
        })
    }
}

/// Settings of the per-cell forward model
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DensifyOptions {
    /// Initial density fraction of every cell
    pub x0: f64,
    pub law: SinteringLaw,
    pub solver: SolverOptions,
}

/// Solver that evolves every cell with the kinetic forward model
#[derive(Debug, Clone, Default)]
pub struct KineticFemSolver {
    pub options: DensifyOptions,
}

impl FemSolver for KineticFemSolver {
    fn run_simulation(
        &self,
        mesh: &dyn CellMesh,
        material: &KineticParameters,
        boundary: &BoundaryConditions,
    ) -> Result<FieldOutput, SinterError> {
        let density = densify_mesh(mesh, &boundary.temperature_history, material, &self.options)?;
        Ok(FieldOutput { density })
    }
}

fn final_density(
    history: &[(f64, f64)],
    params: &KineticParameters,
    options: &DensifyOptions,
) -> Result<f64, SinterError> {
    let (times, temps_k): (Vec<f64>, Vec<f64>) = history
        .iter()
        .map(|(t, temp_c)| (*t, temp_c + CELSIUS_TO_KELVIN))
        .unzip();
    let profile = TemperatureProfile::Sampled(temps_k);
    let density = integrate(params, &times, &profile, options.x0, &options.law, &options.solver)?;
    density
        .last()
        .copied()
        .ok_or_else(|| SinterError::insufficient("empty temperature history"))
}

/// Final density fraction of every cell under one shared temperature history
///
/// The forward model is integrated once; all cells receive the same value.
pub fn densify_mesh(
    mesh: &dyn CellMesh,
    temperature_history: &[(f64, f64)],
    params: &KineticParameters,
    options: &DensifyOptions,
) -> Result<Vec<f64>, SinterError> {
    let density = final_density(temperature_history, params, options)?;
    Ok(vec![density; mesh.num_cells()])
}

/// Final density fraction for a separate temperature history per cell
pub fn densify_cells(
    histories: &[Vec<(f64, f64)>],
    params: &KineticParameters,
    options: &DensifyOptions,
) -> Result<Vec<f64>, SinterError> {
    histories
        .par_iter()
        .map(|history| final_density(history, params, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(offset: f64) -> Vec<(f64, f64)> {
        (0..6).map(|i| (i as f64 * 10.0, 1000.0 + offset + 5.0 * i as f64)).collect()
    }

    #[test]
    fn test_unit_square_cell_count() {
        assert_eq!(UnitSquareMesh::new(0.1).unwrap().num_cells(), 200);
        assert_eq!(UnitSquareMesh::new(2.0).unwrap().num_cells(), 2);
        assert!(UnitSquareMesh::new(0.0).is_err());
    }

    #[test]
    fn test_densify_mesh_broadcasts() {
        let mesh = StructuredMesher.unit_square(0.5).unwrap();
        let params = KineticParameters::new(60.0, 2.0);
        let values = densify_mesh(&mesh, &history(0.0), &params, &DensifyOptions::default()).unwrap();
        assert_eq!(values.len(), 8);
        assert!(values.iter().all(|v| *v == values[0] && *v > 0.0 && *v < 1.0));
    }

    #[test]
    fn test_hotter_cells_densify_more() {
        let params = KineticParameters::new(60.0, 2.0);
        let values = densify_cells(
            &[history(0.0), history(100.0)],
            &params,
            &DensifyOptions::default(),
        )
        .unwrap();
        assert!(values[1] > values[0]);
    }

    #[test]
    fn test_kinetic_solver_matches_densify_mesh() {
        let mesh = UnitSquareMesh::new(0.25).unwrap();
        let params = KineticParameters::new(60.0, 2.0);
        let boundary = BoundaryConditions {
            temperature_history: history(0.0),
        };
        let field = KineticFemSolver::default()
            .run_simulation(&mesh, &params, &boundary)
            .unwrap();
        assert_eq!(field.density.len(), 32);
    }

    #[test]
    fn test_unavailable_capabilities() {
        let mesh_err = UnavailableMesher.unit_square(0.1).unwrap_err();
        assert!(matches!(mesh_err, SinterError::Unavailable { .. }));
        let mesh = UnitSquareMesh::new(0.5).unwrap();
        let boundary = BoundaryConditions {
            temperature_history: history(0.0),
        };
        let err = UnavailableFemSolver
            .run_simulation(&mesh, &KineticParameters::new(1.0, 1.0), &boundary)
            .unwrap_err();
        assert_eq!(err.to_string(), "FEM solver is not available");
    }

    #[test]
    fn test_short_history_is_rejected() {
        let mesh = UnitSquareMesh::new(0.5).unwrap();
        let err = densify_mesh(&mesh, &[(0.0, 1000.0)], &KineticParameters::new(60.0, 2.0), &DensifyOptions::default())
            .unwrap_err();
        assert!(matches!(err, SinterError::InsufficientData { .. }));
    }
}
