//! Module for parsing and representing TSP-with-drones instances.
//!
//! This module handles TSP-LIB format files and holds the immutable
//! problem data shared by all solver variants: the integer distance
//! matrix, the truck speed and the optional drone parameters. Supported
//! edge weights are EUC_2D (rounded Euclidean), GEO (great-circle) and
//! EXPLICIT matrices in LOWER_DIAG_ROW, UPPER_ROW or FULL_MATRIX layout.

use crate::error::SolveError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Earth radius used by the TSP-LIB GEO distance, in kilometers.
const GEO_RADIUS: f64 = 6378.388;
const GEO_PI: f64 = 3.141592;

/// Drone-related parameters of an instance. Absent for plain TSP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneParams {
    /// Drone speed in distance units per time unit.
    pub speed: f64,
    /// Maximum distance a drone can cover on one sortie.
    pub flight_range: f64,
    /// Number of drones available (PDSTSP).
    pub fleet_size: usize,
    /// Customers a drone may serve. `None` means every customer.
    pub eligible: Option<Vec<usize>>,
}

impl DroneParams {
    pub fn new(speed: f64, flight_range: f64, fleet_size: usize) -> Self {
        DroneParams { speed, flight_range, fleet_size, eligible: None }
    }

    /// Check whether a customer belongs to the eligible set.
    pub fn is_eligible(&self, customer: usize) -> bool {
        match &self.eligible {
            Some(set) => set.contains(&customer),
            None => true,
        }
    }
}

/// A complete TSP-with-drones instance. Vertex 0 is the depot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TspdInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Number of vertices (including depot)
    pub dimension: usize,
    /// Symmetric integer distance matrix
    pub distances: Vec<Vec<i64>>,
    /// Truck speed in distance units per time unit
    pub truck_speed: f64,
    /// Drone parameters, when the instance is solved as PDSTSP or FSTSP
    pub drone: Option<DroneParams>,
}

impl TspdInstance {
    /// Build an instance directly from a distance matrix.
    pub fn from_matrix(name: &str, distances: Vec<Vec<i64>>) -> Self {
        TspdInstance {
            name: name.to_string(),
            comment: String::new(),
            dimension: distances.len(),
            distances,
            truck_speed: 1.0,
            drone: None,
        }
    }

    /// Parse an instance from a TSP-LIB format file.
    ///
    /// Drone parameters are not part of TSP-LIB and must be attached by
    /// the caller afterwards.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SolveError> {
        let file = File::open(&path)
            .map_err(|e| SolveError::InputData(format!("cannot open file: {}", e)))?;
        let reader = BufReader::new(file);

        let mut name = String::new();
        let mut comment = String::new();
        let mut dimension = 0usize;
        let mut weight_type = String::new();
        let mut weight_format = String::new();
        let mut coords: Vec<(f64, f64)> = Vec::new();
        let mut weights: Vec<i64> = Vec::new();

        let mut section = String::new();

        for line in reader.lines() {
            let line = line.map_err(|e| SolveError::InputData(format!("read error: {}", e)))?;
            let line = line.trim();

            if line.is_empty() || line == "EOF" {
                continue;
            }

            if let Some((key, value)) = split_keyword(line) {
                match key.as_str() {
                    "NAME" => name = value,
                    "COMMENT" => comment = value,
                    "TYPE" => {}
                    "DIMENSION" => {
                        dimension = value
                            .parse()
                            .map_err(|_| SolveError::InputData("invalid dimension".to_string()))?;
                    }
                    "EDGE_WEIGHT_TYPE" => weight_type = value,
                    "EDGE_WEIGHT_FORMAT" => weight_format = value,
                    _ => {}
                }
                continue;
            }

            if line.starts_with("NODE_COORD_SECTION") {
                section = "coords".to_string();
                continue;
            }
            if line.starts_with("EDGE_WEIGHT_SECTION") {
                section = "weights".to_string();
                continue;
            }
            if line.starts_with("DISPLAY_DATA_SECTION") || line.starts_with("DEMAND_SECTION") {
                section = "ignored".to_string();
                continue;
            }

            match section.as_str() {
                "coords" => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() >= 3 {
                        let x: f64 = parts[1]
                            .parse()
                            .map_err(|_| SolveError::InputData("invalid x coordinate".to_string()))?;
                        let y: f64 = parts[2]
                            .parse()
                            .map_err(|_| SolveError::InputData("invalid y coordinate".to_string()))?;
                        coords.push((x, y));
                    }
                }
                "weights" => {
                    for tok in line.split_whitespace() {
                        let w: i64 = tok
                            .parse()
                            .map_err(|_| SolveError::InputData("invalid edge weight".to_string()))?;
                        weights.push(w);
                    }
                }
                _ => {}
            }
        }

        if dimension == 0 {
            return Err(SolveError::InputData("missing DIMENSION".to_string()));
        }

        let distances = match weight_type.as_str() {
            "EUC_2D" => {
                if coords.len() != dimension {
                    return Err(SolveError::InputData(format!(
                        "expected {} coordinates, found {}",
                        dimension,
                        coords.len()
                    )));
                }
                euclidean_matrix(&coords)
            }
            "GEO" => {
                if coords.len() != dimension {
                    return Err(SolveError::InputData(format!(
                        "expected {} coordinates, found {}",
                        dimension,
                        coords.len()
                    )));
                }
                geo_matrix(&coords)
            }
            "EXPLICIT" => explicit_matrix(dimension, &weight_format, &weights)?,
            other => {
                return Err(SolveError::InputData(format!(
                    "unsupported edge weight type: {}",
                    other
                )))
            }
        };

        log::debug!("loaded instance {} with {} vertices", name, dimension);

        let instance = TspdInstance {
            name,
            comment,
            dimension,
            distances,
            truck_speed: 1.0,
            drone: None,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Check the structural invariants of the instance data. Called by
    /// the orchestrator before any engine variable is created.
    pub fn validate(&self) -> Result<(), SolveError> {
        if self.dimension < 2 {
            return Err(SolveError::InputData(format!(
                "dimension must be at least 2, got {}",
                self.dimension
            )));
        }
        if self.distances.len() != self.dimension {
            return Err(SolveError::InputData(format!(
                "distance matrix has {} rows for dimension {}",
                self.distances.len(),
                self.dimension
            )));
        }
        for (i, row) in self.distances.iter().enumerate() {
            if row.len() != self.dimension {
                return Err(SolveError::InputData(format!(
                    "distance matrix row {} has {} entries for dimension {}",
                    i,
                    row.len(),
                    self.dimension
                )));
            }
            if row[i] != 0 {
                return Err(SolveError::InputData(format!(
                    "distance matrix diagonal entry {} is non-zero",
                    i
                )));
            }
            for j in 0..self.dimension {
                if row[j] < 0 {
                    return Err(SolveError::InputData(format!(
                        "negative distance at ({}, {})",
                        i, j
                    )));
                }
                if row[j] != self.distances[j][i] {
                    return Err(SolveError::InputData(format!(
                        "distance matrix not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }
        if self.truck_speed <= 0.0 {
            return Err(SolveError::InputData("truck speed must be positive".to_string()));
        }
        if let Some(drone) = &self.drone {
            if drone.speed <= 0.0 {
                return Err(SolveError::InputData("drone speed must be positive".to_string()));
            }
            if drone.flight_range <= 0.0 {
                return Err(SolveError::InputData("flight range must be positive".to_string()));
            }
            if drone.fleet_size == 0 {
                return Err(SolveError::InputData("drone fleet size must be positive".to_string()));
            }
        }
        Ok(())
    }

    /// Get the distance between two vertices.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> i64 {
        self.distances[i][j]
    }

    /// Truck travel time between two vertices.
    #[inline]
    pub fn truck_time(&self, i: usize, j: usize) -> f64 {
        self.distances[i][j] as f64 / self.truck_speed
    }

    /// Drone travel time between two vertices. Requires drone parameters.
    #[inline]
    pub fn drone_time(&self, i: usize, j: usize) -> f64 {
        let drone = self.drone.as_ref().expect("instance has no drone parameters");
        self.distances[i][j] as f64 / drone.speed
    }

    /// Drone travel time over the augmented vertex set, where index
    /// `dimension` aliases the physical depot 0.
    #[inline]
    pub fn drone_time_aug(&self, i: usize, j: usize) -> f64 {
        let a = if i == self.dimension { 0 } else { i };
        let b = if j == self.dimension { 0 } else { j };
        self.drone_time(a, b)
    }

    /// Truck travel time over the augmented vertex set.
    #[inline]
    pub fn truck_time_aug(&self, i: usize, j: usize) -> f64 {
        let a = if i == self.dimension { 0 } else { i };
        let b = if j == self.dimension { 0 } else { j };
        self.truck_time(a, b)
    }

    /// Maximum sortie duration of a drone.
    #[inline]
    pub fn flight_time(&self) -> f64 {
        let drone = self.drone.as_ref().expect("instance has no drone parameters");
        drone.flight_range / drone.speed
    }

    /// Get the number of customer vertices (excluding depot).
    pub fn num_customers(&self) -> usize {
        self.dimension - 1
    }

    /// Get statistics about the instance.
    pub fn statistics(&self) -> InstanceStatistics {
        let mut distances: Vec<i64> = Vec::new();
        for i in 0..self.dimension {
            for j in i + 1..self.dimension {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = distances.iter().sum::<i64>() as f64 / distances.len() as f64;
        let max_distance = distances.iter().copied().max().unwrap_or(0);

        let drone_reachable = match &self.drone {
            Some(_) => {
                let half = self.flight_time() / 2.0;
                (1..self.dimension)
                    .filter(|&c| self.drone_time(0, c) <= half)
                    .count()
            }
            None => 0,
        };

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            avg_distance,
            max_distance,
            has_drone: self.drone.is_some(),
            drone_reachable,
        }
    }
}

/// Split a `KEYWORD : value` header line. Returns `None` for section
/// markers and data lines.
fn split_keyword(line: &str) -> Option<(String, String)> {
    let idx = line.find(':')?;
    let key = line[..idx].trim();
    if key.is_empty() || key.chars().any(|c| !c.is_ascii_uppercase() && c != '_') {
        return None;
    }
    Some((key.to_string(), line[idx + 1..].trim().to_string()))
}

/// TSP-LIB nearest-integer rounding.
#[inline]
fn nint(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Rounded Euclidean distances (EUC_2D).
fn euclidean_matrix(coords: &[(f64, f64)]) -> Vec<Vec<i64>> {
    let n = coords.len();
    let mut matrix = vec![vec![0i64; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let dx = coords[i].0 - coords[j].0;
                let dy = coords[i].1 - coords[j].1;
                matrix[i][j] = nint((dx * dx + dy * dy).sqrt());
            }
        }
    }
    matrix
}

/// Convert a TSP-LIB DD.MM coordinate to radians.
fn geo_radians(x: f64) -> f64 {
    let deg = x.trunc();
    let min = x - deg;
    GEO_PI * (deg + 5.0 * min / 3.0) / 180.0
}

/// Great-circle distances (GEO), following the TSP-LIB reference.
fn geo_matrix(coords: &[(f64, f64)]) -> Vec<Vec<i64>> {
    let n = coords.len();
    let lat: Vec<f64> = coords.iter().map(|c| geo_radians(c.0)).collect();
    let lon: Vec<f64> = coords.iter().map(|c| geo_radians(c.1)).collect();

    let mut matrix = vec![vec![0i64; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let q1 = (lon[i] - lon[j]).cos();
                let q2 = (lat[i] - lat[j]).cos();
                let q3 = (lat[i] + lat[j]).cos();
                let d = GEO_RADIUS * (0.5 * ((1.0 + q1) * q2 - (1.0 - q1) * q3)).acos() + 1.0;
                matrix[i][j] = d as i64;
            }
        }
    }
    matrix
}

/// Expand an EDGE_WEIGHT_SECTION number stream into a full matrix.
fn explicit_matrix(
    dimension: usize,
    format: &str,
    weights: &[i64],
) -> Result<Vec<Vec<i64>>, SolveError> {
    let n = dimension;
    let mut matrix = vec![vec![0i64; n]; n];

    let expect = |count: usize| -> Result<(), SolveError> {
        if weights.len() != count {
            Err(SolveError::InputData(format!(
                "edge weight section has {} entries, expected {}",
                weights.len(),
                count
            )))
        } else {
            Ok(())
        }
    };

    match format {
        "FULL_MATRIX" => {
            expect(n * n)?;
            for i in 0..n {
                for j in 0..n {
                    matrix[i][j] = weights[i * n + j];
                }
            }
        }
        "LOWER_DIAG_ROW" => {
            expect(n * (n + 1) / 2)?;
            let mut k = 0;
            for i in 0..n {
                for j in 0..=i {
                    matrix[i][j] = weights[k];
                    matrix[j][i] = weights[k];
                    k += 1;
                }
            }
        }
        "UPPER_ROW" => {
            expect(n * (n - 1) / 2)?;
            let mut k = 0;
            for i in 0..n {
                for j in i + 1..n {
                    matrix[i][j] = weights[k];
                    matrix[j][i] = weights[k];
                    k += 1;
                }
            }
        }
        other => {
            return Err(SolveError::InputData(format!(
                "unsupported edge weight format: {}",
                other
            )))
        }
    }

    Ok(matrix)
}

/// Statistics about an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub avg_distance: f64,
    pub max_distance: i64,
    pub has_drone: bool,
    pub drone_reachable: usize,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Vertices: {} (1 depot + {} customers)", self.dimension, self.dimension - 1)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {}", self.max_distance)?;
        if self.has_drone {
            writeln!(f, "  Drone-reachable customers: {}", self.drone_reachable)
        } else {
            writeln!(f, "  No drone parameters attached")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_rounding() {
        let coords = vec![(0.0, 0.0), (3.0, 4.0), (1.0, 1.0)];
        let matrix = euclidean_matrix(&coords);
        assert_eq!(matrix[0][1], 5);
        assert_eq!(matrix[1][0], 5);
        // sqrt(2) = 1.414... rounds down to 1
        assert_eq!(matrix[0][2], 1);
        assert_eq!(matrix[0][0], 0);
    }

    #[test]
    fn test_explicit_lower_diag_row() {
        // 3x3 symmetric matrix given as its lower triangle with diagonal
        let weights = vec![0, 7, 0, 4, 9, 0];
        let matrix = explicit_matrix(3, "LOWER_DIAG_ROW", &weights).unwrap();
        assert_eq!(matrix[1][0], 7);
        assert_eq!(matrix[0][1], 7);
        assert_eq!(matrix[2][0], 4);
        assert_eq!(matrix[2][1], 9);
        assert_eq!(matrix[1][2], 9);
        assert_eq!(matrix[2][2], 0);
    }

    #[test]
    fn test_explicit_upper_row() {
        let weights = vec![7, 4, 9];
        let matrix = explicit_matrix(3, "UPPER_ROW", &weights).unwrap();
        assert_eq!(matrix[0][1], 7);
        assert_eq!(matrix[0][2], 4);
        assert_eq!(matrix[1][2], 9);
        assert_eq!(matrix[2][1], 9);
    }

    #[test]
    fn test_explicit_wrong_count() {
        let weights = vec![1, 2, 3];
        assert!(explicit_matrix(3, "FULL_MATRIX", &weights).is_err());
    }

    #[test]
    fn test_validate_rejects_asymmetry() {
        let mut instance = TspdInstance::from_matrix(
            "bad",
            vec![vec![0, 2, 3], vec![2, 0, 4], vec![3, 4, 0]],
        );
        assert!(instance.validate().is_ok());
        instance.distances[0][1] = 9;
        let err = instance.validate().unwrap_err();
        assert!(matches!(err, SolveError::InputData(_)));
    }

    #[test]
    fn test_validate_rejects_bad_diagonal() {
        let instance = TspdInstance::from_matrix("bad", vec![vec![1, 2], vec![2, 0]]);
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_geo_symmetry() {
        let coords = vec![(48.51, 2.20), (52.30, 13.25), (41.54, 12.29)];
        let matrix = geo_matrix(&coords);
        for i in 0..3 {
            assert_eq!(matrix[i][i], 0);
            for j in 0..3 {
                assert_eq!(matrix[i][j], matrix[j][i]);
                if i != j {
                    // European capitals are several hundred kilometers apart
                    assert!(matrix[i][j] > 100);
                }
            }
        }
    }

    #[test]
    fn test_flight_time() {
        let mut instance = TspdInstance::from_matrix("d", vec![vec![0, 5], vec![5, 0]]);
        instance.drone = Some(DroneParams::new(2.0, 30.0, 1));
        assert!((instance.flight_time() - 15.0).abs() < 1e-12);
        assert!((instance.drone_time(0, 1) - 2.5).abs() < 1e-12);
        assert!((instance.drone_time_aug(2, 1) - 2.5).abs() < 1e-12);
    }
}
