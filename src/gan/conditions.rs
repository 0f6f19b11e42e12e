//! Condition sets for the conditional generator
//!
//! `objects.json` maps each object name to a slot index. A condition file is a
//! JSON list of lists of object names; each inner list becomes one multi-hot
//! vector with a 1.0 in the slot of every listed object.

use std::collections::HashMap;
use std::path::Path;

use burn::tensor::{backend::Backend, Tensor, TensorData};

use crate::utils::error::{LabError, Result};

/// Number of object slots in a condition vector
pub const NUM_OBJECTS: usize = 24;

/// Multi-hot condition vectors, one row per image to generate
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    rows: Vec<[f32; NUM_OBJECTS]>,
}

impl Conditions {
    /// Encode object-name lists through `objects`
    pub fn encode(sets: &[Vec<String>], objects: &HashMap<String, usize>) -> Result<Self> {
        let rows = sets
            .iter()
            .enumerate()
            .map(|(row, names)| {
                let mut vector = [0.0f32; NUM_OBJECTS];
                for name in names {
                    let slot = *objects.get(name).ok_or_else(|| {
                        LabError::Dataset(format!("condition {}: unknown object '{}'", row, name))
                    })?;
                    if slot >= NUM_OBJECTS {
                        return Err(LabError::Dataset(format!(
                            "object '{}' maps to slot {}, only {} slots exist",
                            name, slot, NUM_OBJECTS
                        )));
                    }
                    vector[slot] = 1.0;
                }
                Ok(vector)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    /// Read a condition file and encode it with the object index at `objects_path`
    pub fn load(conditions_path: &Path, objects_path: &Path) -> Result<Self> {
        let objects = load_object_index(objects_path)?;
        let sets: Vec<Vec<String>> = read_json(conditions_path)?;
        Self::encode(&sets, &objects)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[f32; NUM_OBJECTS]] {
        &self.rows
    }

    /// `[n, NUM_OBJECTS]` tensor
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let data: Vec<f32> = self.rows.iter().flatten().copied().collect();
        Tensor::from_floats(TensorData::new(data, [self.rows.len(), NUM_OBJECTS]), device)
    }
}

/// Object name to slot index
pub fn load_object_index(path: &Path) -> Result<HashMap<String, usize>> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| LabError::Dataset(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| LabError::Serialization(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use std::fs;

    fn objects() -> HashMap<String, usize> {
        [("gray cube", 0), ("red sphere", 5), ("yellow cylinder", 23)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_encode_multi_hot() {
        let sets = vec![
            vec!["gray cube".to_string(), "yellow cylinder".to_string()],
            vec!["red sphere".to_string()],
        ];
        let conditions = Conditions::encode(&sets, &objects()).unwrap();

        assert_eq!(conditions.len(), 2);
        let first = conditions.rows()[0];
        assert_eq!(first[0], 1.0);
        assert_eq!(first[23], 1.0);
        assert_eq!(first.iter().sum::<f32>(), 2.0);
        assert_eq!(conditions.rows()[1][5], 1.0);
    }

    #[test]
    fn test_unknown_object_rejected() {
        let sets = vec![vec!["blue torus".to_string()]];
        assert!(matches!(
            Conditions::encode(&sets, &objects()),
            Err(LabError::Dataset(_))
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let objects_path = dir.path().join("objects.json");
        let test_path = dir.path().join("test.json");
        fs::write(&objects_path, r#"{"gray cube": 0, "red sphere": 5}"#).unwrap();
        fs::write(&test_path, r#"[["gray cube"], ["gray cube", "red sphere"], []]"#).unwrap();

        let conditions = Conditions::load(&test_path, &objects_path).unwrap();
        assert_eq!(conditions.len(), 3);

        let tensor = conditions.to_tensor::<NdArray>(&Default::default());
        assert_eq!(tensor.dims(), [3, NUM_OBJECTS]);
        let sums: Vec<f32> = tensor.sum_dim(1).into_data().to_vec().unwrap();
        assert_eq!(sums, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_object_index(&path),
            Err(LabError::Serialization(_))
        ));
    }
}
