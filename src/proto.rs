// Wire messages of the TensorFlow Serving prediction API.
//
// Only the subset of tensorflow/core/framework/{types,tensor_shape,tensor}.proto and
// tensorflow_serving/apis/{model,predict}.proto that the Predict call needs. Field tags
// follow the upstream definitions; fields left out here are skipped as unknown fields
// when decoding.

pub mod tensorflow {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum DataType {
        DtInvalid = 0,
        DtFloat = 1,
        DtDouble = 2,
        DtInt32 = 3,
        DtUint8 = 4,
        DtInt16 = 5,
        DtInt8 = 6,
        DtString = 7,
        DtComplex64 = 8,
        DtInt64 = 9,
        DtBool = 10,
        DtQint8 = 11,
        DtQuint8 = 12,
        DtQint32 = 13,
        DtBfloat16 = 14,
        DtQint16 = 15,
        DtQuint16 = 16,
        DtUint16 = 17,
        DtComplex128 = 18,
        DtHalf = 19,
        DtResource = 20,
        DtVariant = 21,
        DtUint32 = 22,
        DtUint64 = 23,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TensorShapeProto {
        #[prost(message, repeated, tag = "2")]
        pub dim: Vec<tensor_shape_proto::Dim>,
        #[prost(bool, tag = "3")]
        pub unknown_rank: bool,
    }

    pub mod tensor_shape_proto {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Dim {
            #[prost(int64, tag = "1")]
            pub size: i64,
            #[prost(string, tag = "2")]
            pub name: String,
        }
    }

    impl TensorShapeProto {
        pub fn from_sizes(sizes: &[i64]) -> Self {
            TensorShapeProto {
                dim: sizes
                    .iter()
                    .map(|&size| tensor_shape_proto::Dim {
                        size,
                        name: String::new(),
                    })
                    .collect(),
                unknown_rank: false,
            }
        }

        pub fn sizes(&self) -> Vec<i64> {
            self.dim.iter().map(|dim| dim.size).collect()
        }
    }

    // Exactly one of the *_val fields (or tensor_content) is populated, according to dtype
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TensorProto {
        #[prost(enumeration = "DataType", tag = "1")]
        pub dtype: i32,
        #[prost(message, optional, tag = "2")]
        pub tensor_shape: Option<TensorShapeProto>,
        #[prost(int32, tag = "3")]
        pub version_number: i32,
        // Little-endian packed representation of the whole tensor
        #[prost(bytes = "vec", tag = "4")]
        pub tensor_content: Vec<u8>,
        #[prost(int32, repeated, tag = "13")]
        pub half_val: Vec<i32>,
        #[prost(float, repeated, tag = "5")]
        pub float_val: Vec<f32>,
        #[prost(double, repeated, tag = "6")]
        pub double_val: Vec<f64>,
        #[prost(int32, repeated, tag = "7")]
        pub int_val: Vec<i32>,
        #[prost(bytes = "vec", repeated, tag = "8")]
        pub string_val: Vec<Vec<u8>>,
        #[prost(float, repeated, tag = "9")]
        pub scomplex_val: Vec<f32>,
        #[prost(int64, repeated, tag = "10")]
        pub int64_val: Vec<i64>,
        #[prost(bool, repeated, tag = "11")]
        pub bool_val: Vec<bool>,
        #[prost(double, repeated, tag = "12")]
        pub dcomplex_val: Vec<f64>,
        #[prost(uint32, repeated, tag = "16")]
        pub uint32_val: Vec<u32>,
        #[prost(uint64, repeated, tag = "17")]
        pub uint64_val: Vec<u64>,
    }

    pub mod serving {
        use std::collections::HashMap;

        use super::TensorProto;

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ModelSpec {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(oneof = "model_spec::VersionChoice", tags = "2, 4")]
            pub version_choice: Option<model_spec::VersionChoice>,
            #[prost(string, tag = "3")]
            pub signature_name: String,
        }

        pub mod model_spec {
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum VersionChoice {
                // google.protobuf.Int64Value
                #[prost(message, tag = "2")]
                Version(i64),
                #[prost(string, tag = "4")]
                VersionLabel(String),
            }
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct PredictRequest {
            #[prost(message, optional, tag = "1")]
            pub model_spec: Option<ModelSpec>,
            #[prost(map = "string, message", tag = "2")]
            pub inputs: HashMap<String, TensorProto>,
            #[prost(string, repeated, tag = "3")]
            pub output_filter: Vec<String>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct PredictResponse {
            #[prost(message, optional, tag = "2")]
            pub model_spec: Option<ModelSpec>,
            #[prost(map = "string, message", tag = "1")]
            pub outputs: HashMap<String, TensorProto>,
        }

        pub const PREDICT_PATH: &str = "/tensorflow.serving.PredictionService/Predict";
    }
}
