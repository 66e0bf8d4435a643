use thiserror::Error;

use crate::proto::tensorflow::{DataType, TensorProto, TensorShapeProto};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConversionError {
    #[error("image has no pixels")]
    Empty,

    #[error("row {row} has {found} pixels, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{0} elements do not fit in a tensor dimension")]
    TooLarge(usize),

    #[error("expected a float tensor, got {0:?}")]
    UnexpectedDtype(DataType),

    #[error("tensor content is {0} bytes, not a whole number of floats")]
    MisalignedContent(usize),
}

// Build a DT_FLOAT tensor with the given shape
pub fn float_tensor(shape: &[i64], values: Vec<f32>) -> TensorProto {
    TensorProto {
        dtype: DataType::DtFloat as i32,
        tensor_shape: Some(TensorShapeProto::from_sizes(shape)),
        float_val: values,
        ..Default::default()
    }
}

// Flatten an image row by row into a 1 x (rows * cols) float tensor
pub fn image_tensor(image: &[Vec<u8>]) -> Result<TensorProto, ConversionError> {
    let cols = image.first().map_or(0, Vec::len);
    if cols == 0 {
        return Err(ConversionError::Empty);
    }

    let mut values = Vec::with_capacity(image.len() * cols);
    for (row, pixels) in image.iter().enumerate() {
        if pixels.len() != cols {
            return Err(ConversionError::RaggedRow {
                row,
                expected: cols,
                found: pixels.len(),
            });
        }
        values.extend(pixels.iter().map(|&pixel| f32::from(pixel)));
    }

    let features =
        i64::try_from(values.len()).map_err(|_| ConversionError::TooLarge(values.len()))?;
    Ok(float_tensor(&[1, features], values))
}

// Read the values of a float tensor, whichever way the server chose to encode them
pub fn scores(tensor: &TensorProto) -> Result<Vec<f32>, ConversionError> {
    let dtype = tensor.dtype();
    if dtype != DataType::DtFloat {
        return Err(ConversionError::UnexpectedDtype(dtype));
    }

    if tensor.tensor_content.is_empty() {
        return Ok(tensor.float_val.clone());
    }

    let content = &tensor.tensor_content;
    if content.len() % 4 != 0 {
        return Err(ConversionError::MisalignedContent(content.len()));
    }
    Ok(content
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn test_flatten_2x2() {
        let tensor = image_tensor(&[vec![0, 128], vec![255, 64]]).unwrap();
        assert_eq!(tensor.float_val, vec![0.0, 128.0, 255.0, 64.0]);
        assert_eq!(tensor.dtype(), DataType::DtFloat);
        assert_eq!(tensor.tensor_shape.unwrap().sizes(), vec![1, 4]);
    }

    #[test]
    fn test_flatten_row_major() {
        let mut rng = SmallRng::seed_from_u64(0);
        for size in [1, 3, 28] {
            let image: Vec<Vec<u8>> = (0..size)
                .map(|_| (0..size).map(|_| rng.gen::<u8>()).collect())
                .collect();
            let tensor = image_tensor(&image).unwrap();

            assert_eq!(tensor.float_val.len(), size * size);
            assert_eq!(
                tensor.tensor_shape.as_ref().unwrap().sizes(),
                vec![1, (size * size) as i64]
            );
            for (r, row) in image.iter().enumerate() {
                for (c, &pixel) in row.iter().enumerate() {
                    assert_eq!(tensor.float_val[r * size + c], pixel as f32);
                }
            }
        }
    }

    #[test]
    fn test_non_square_grid() {
        let tensor = image_tensor(&[vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(tensor.tensor_shape.unwrap().sizes(), vec![1, 6]);
    }

    #[test]
    fn test_ragged_rows() {
        assert_eq!(
            image_tensor(&[vec![1, 2], vec![3]]),
            Err(ConversionError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(image_tensor(&[]), Err(ConversionError::Empty));
        assert_eq!(image_tensor(&[vec![]]), Err(ConversionError::Empty));
    }

    #[test]
    fn test_scores() {
        let tensor = float_tensor(&[1, 3], vec![0.1, 0.7, 0.2]);
        assert_eq!(scores(&tensor), Ok(vec![0.1, 0.7, 0.2]));

        let packed = TensorProto {
            dtype: DataType::DtFloat as i32,
            tensor_content: [0.5_f32, -1.0].iter().flat_map(|x| x.to_le_bytes()).collect(),
            ..Default::default()
        };
        assert_eq!(scores(&packed), Ok(vec![0.5, -1.0]));
    }

    #[test]
    fn test_scores_errors() {
        let ints = TensorProto {
            dtype: DataType::DtInt64 as i32,
            int64_val: vec![3],
            ..Default::default()
        };
        assert_eq!(
            scores(&ints),
            Err(ConversionError::UnexpectedDtype(DataType::DtInt64))
        );

        let misaligned = TensorProto {
            dtype: DataType::DtFloat as i32,
            tensor_content: vec![0; 6],
            ..Default::default()
        };
        assert_eq!(scores(&misaligned), Err(ConversionError::MisalignedContent(6)));
    }
}
