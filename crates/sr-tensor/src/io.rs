use crate::error::{Result, TensorError};
use crate::table::{Column, Table};
use crate::tensor::Tensor;

/// Ordered collection of uniquely named tensors.
///
/// Iteration follows insertion order. Like `Tensor`, a `TensorIO` is never
/// mutated in place; `with`, `merge` and `retain` return new values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TensorIO {
    entries: Vec<(String, Tensor)>,
}

impl TensorIO {
    /// An empty collection.
    pub fn empty() -> Self {
        TensorIO {
            entries: Vec::new(),
        }
    }

    /// Build from `(name, tensor)` pairs, rejecting duplicate names.
    pub fn new<N, I>(entries: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Tensor)>,
    {
        entries
            .into_iter()
            .try_fold(TensorIO::empty(), |io, (name, tensor)| io.with(name, tensor))
    }

    /// Append one named tensor, rejecting a duplicate name.
    pub fn with(mut self, name: impl Into<String>, tensor: Tensor) -> Result<Self> {
        let name = name.into();
        if self.contains(&name) {
            return Err(TensorError::DuplicateName(name));
        }
        self.entries.push((name, tensor));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&Tensor> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
            .ok_or_else(|| TensorError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> + '_ {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of `self` overlaid with `other`.
    ///
    /// A name present in both keeps its position and takes `other`'s tensor;
    /// new names are appended in `other`'s order.
    pub fn merge(&self, other: &TensorIO) -> TensorIO {
        let mut entries = self.entries.clone();
        for (name, tensor) in &other.entries {
            match entries.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = tensor.clone(),
                None => entries.push((name.clone(), tensor.clone())),
            }
        }
        TensorIO { entries }
    }

    /// Only the entries whose names are listed, in their current order.
    pub fn retain<S: AsRef<str>>(&self, names: &[S]) -> TensorIO {
        let entries = self
            .entries
            .iter()
            .filter(|(n, _)| names.iter().any(|keep| keep.as_ref() == n))
            .cloned()
            .collect();
        TensorIO { entries }
    }

    /// Concatenate each tensor with its namesake in `other` along `axis`.
    ///
    /// Both collections must hold the same names; the result keeps `self`'s
    /// order.
    pub fn concat(&self, other: &TensorIO, axis: usize) -> Result<TensorIO> {
        if let Some(extra) = other.names().find(|n| !self.contains(n)) {
            return Err(TensorError::NotFound(extra.to_string()));
        }
        self.entries
            .iter()
            .try_fold(TensorIO::empty(), |io, (name, tensor)| {
                let joined = tensor.concat(other.get(name)?, axis)?;
                io.with(name.clone(), joined)
            })
    }

    /// Every tensor with its size-1 dimensions dropped.
    pub fn squeeze_all(&self) -> TensorIO {
        let entries = self
            .entries
            .iter()
            .map(|(name, tensor)| (name.clone(), tensor.squeeze()))
            .collect();
        TensorIO { entries }
    }

    /// Largest leading dimension across entries; scalars count as one row.
    pub fn batch_size(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, t)| t.shape().leading_dim().unwrap_or(1))
            .max()
            .unwrap_or(0)
    }

    /// Render as a table with one column per tensor, in iteration order.
    ///
    /// Every tensor must be 1-D and all must share one length; anything else
    /// is a conversion error rather than truncation or padding.
    pub fn into_table(&self) -> Result<Table> {
        let mut rows: Option<usize> = None;
        for (name, tensor) in &self.entries {
            let len = match tensor.shape().dims() {
                [len] => *len,
                _ => {
                    return Err(TensorError::Conversion(format!(
                        "tensor '{}' has shape {}, expected a vector",
                        name,
                        tensor.shape()
                    )))
                }
            };
            match rows {
                Some(expected) if expected != len => {
                    return Err(TensorError::Conversion(format!(
                        "tensor '{}' has {} rows, expected {}",
                        name, len, expected
                    )));
                }
                _ => rows = Some(len),
            }
        }

        let columns = self
            .entries
            .iter()
            .map(|(name, tensor)| Column::from_data(name.clone(), tensor.data()))
            .collect::<Result<Vec<_>>>()?;
        Table::new(columns)
    }

    /// One 1-D tensor per column, dtype taken from the column.
    pub fn from_table(table: &Table) -> Result<TensorIO> {
        let rows = table.row_count();
        table.columns().iter().try_fold(TensorIO::empty(), |io, column| {
            let tensor = Tensor::new(column.dtype(), [rows], column.to_data()?)?;
            io.with(column.name(), tensor)
        })
    }
}

impl<'a> IntoIterator for &'a TensorIO {
    type Item = &'a (String, Tensor);
    type IntoIter = std::slice::Iter<'a, (String, Tensor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;
    use crate::table::Cell;
    use half::f16;

    fn sample() -> TensorIO {
        TensorIO::new([
            ("col1", Tensor::from_i64_data(vec![1, 2, 3])),
            ("col2", Tensor::from_string_data(vec!["1", "2", "3"])),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_name() {
        let err = TensorIO::new([
            ("a", Tensor::from_i32_data(vec![1])),
            ("a", Tensor::from_i32_data(vec![2])),
        ])
        .unwrap_err();
        assert_eq!(err, TensorError::DuplicateName("a".into()));
    }

    #[test]
    fn test_get_and_order() {
        let io = sample();
        assert_eq!(io.names().collect::<Vec<_>>(), vec!["col1", "col2"]);
        assert_eq!(io.get("col1").unwrap().dtype(), DataType::Int64);
        assert_eq!(io.get("nope"), Err(TensorError::NotFound("nope".into())));
    }

    #[test]
    fn test_into_table() {
        let table = sample().into_table().unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 3);
        let col1 = table.column("col1").unwrap();
        assert_eq!(col1.cells(), &[Cell::Int(1), Cell::Int(2), Cell::Int(3)]);
        let col2 = table.column("col2").unwrap();
        assert_eq!(col2.cells()[0], Cell::Text("1".into()));
        assert_eq!(table.columns()[0].name(), "col1");
    }

    #[test]
    fn test_into_table_length_mismatch() {
        let io = TensorIO::new([
            ("a", Tensor::from_f32_data(vec![1.0, 2.0])),
            ("b", Tensor::from_f32_data(vec![1.0])),
        ])
        .unwrap();
        assert!(matches!(io.into_table(), Err(TensorError::Conversion(_))));
    }

    #[test]
    fn test_into_table_rejects_matrix_and_scalar() {
        let matrix = Tensor::from_shape_vec([2, 2], vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let io = TensorIO::new([("m", matrix)]).unwrap();
        assert!(matches!(io.into_table(), Err(TensorError::Conversion(_))));

        let io = TensorIO::new([("s", Tensor::scalar(1i32))]).unwrap();
        assert!(matches!(io.into_table(), Err(TensorError::Conversion(_))));
    }

    #[test]
    fn test_table_roundtrip_preserves_everything() {
        let io = TensorIO::new([
            ("b", Tensor::from_bool_data(vec![true, false])),
            ("i8", Tensor::from_i8_data(vec![-1, 127])),
            ("i16", Tensor::from_i16_data(vec![-300, 300])),
            ("i32", Tensor::from_i32_data(vec![i32::MIN, 0])),
            ("i64", Tensor::from_i64_data(vec![i64::MAX, 5])),
            (
                "f16",
                Tensor::from_f16_data(vec![f16::from_f32(0.5), f16::from_f32(-2.0)]),
            ),
            ("f32", Tensor::from_f32_data(vec![0.1, 1e-7])),
            ("f64", Tensor::from_f64_data(vec![0.1, f64::MAX])),
            ("s", Tensor::from_string_data(vec!["x", ""])),
        ])
        .unwrap();
        let back = TensorIO::from_table(&io.into_table().unwrap()).unwrap();
        assert_eq!(back, io);
    }

    #[test]
    fn test_empty_roundtrip() {
        let io = TensorIO::empty();
        let back = TensorIO::from_table(&io.into_table().unwrap()).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_merge_replaces_in_place() {
        let left = sample();
        let right = TensorIO::new([
            ("col2", Tensor::from_i32_data(vec![9])),
            ("col3", Tensor::from_bool_data(vec![true])),
        ])
        .unwrap();
        let merged = left.merge(&right);
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["col1", "col2", "col3"]);
        assert_eq!(merged.get("col2").unwrap().dtype(), DataType::Int32);
        assert_eq!(left.get("col2").unwrap().dtype(), DataType::String);
    }

    #[test]
    fn test_concat_assembles_a_batch() {
        let row = |a: i64, b: &str| {
            TensorIO::new([
                ("id", Tensor::from_i64_data(vec![a])),
                ("label", Tensor::from_string_data(vec![b])),
            ])
            .unwrap()
        };
        let batch = row(1, "x").concat(&row(2, "y"), 0).unwrap();
        assert_eq!(batch.names().collect::<Vec<_>>(), vec!["id", "label"]);
        assert_eq!(batch.get("id").unwrap().as_slice::<i64>().unwrap(), &[1, 2]);
        assert_eq!(batch.batch_size(), 2);

        let other = TensorIO::new([("id", Tensor::from_i64_data(vec![3]))]).unwrap();
        assert_eq!(
            row(1, "x").concat(&other, 0),
            Err(TensorError::NotFound("label".into()))
        );
        assert_eq!(
            other.concat(&row(1, "x"), 0),
            Err(TensorError::NotFound("label".into()))
        );
    }

    #[test]
    fn test_squeeze_all() {
        let io = TensorIO::new([
            ("a", Tensor::from_shape_vec([1, 2], vec![1.0f32, 2.0]).unwrap()),
            ("b", Tensor::from_shape_vec([1], vec![5i32]).unwrap()),
        ])
        .unwrap();
        let squeezed = io.squeeze_all();
        assert_eq!(squeezed.get("a").unwrap().shape().dims(), &[2]);
        assert!(squeezed.get("b").unwrap().shape().is_scalar());
    }

    #[test]
    fn test_retain_and_batch_size() {
        let io = sample().retain(&["col2"]);
        assert_eq!(io.len(), 1);
        assert_eq!(io.batch_size(), 3);
        assert_eq!(TensorIO::empty().batch_size(), 0);
    }
}
