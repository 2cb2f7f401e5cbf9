//! Scoring seam and its ONNX implementation.

use std::path::Path;

use ndarray::{arr2, Array2};
use serde_json::Value;
use tract_onnx::pb::ModelProto;
use tract_onnx::prelude::*;

use crate::error::{LoadError, ScoringError};
use crate::features::{FeatureOrder, FeatureRow};

/// Anything that turns one complete feature row into a class label.
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<i64, ScoringError>;
}

#[derive(Debug, Clone, PartialEq)]
enum InputLayout {
    /// One `[1, n]` f32 input holding every feature in order.
    Dense { fields: Vec<String> },
    /// One `[1, 1]` input per feature, bound by name.
    Columns(Vec<ColumnInput>),
}

#[derive(Debug, Clone, PartialEq)]
struct ColumnInput {
    field: String,
    datum: DatumType,
}

impl InputLayout {
    fn encode(&self, row: &FeatureRow) -> Result<TVec<Tensor>, ScoringError> {
        match self {
            InputLayout::Dense { fields } => {
                let values = fields
                    .iter()
                    .map(|field| {
                        let value = row
                            .get(field)
                            .ok_or_else(|| ScoringError::MissingField(field.clone()))?;
                        Ok(coerce_number(field, value)? as f32)
                    })
                    .collect::<Result<Vec<f32>, ScoringError>>()?;
                let width = values.len();
                let dense = Array2::from_shape_vec((1, width), values)
                    .map_err(|e| ScoringError::Runtime(e.to_string()))?;
                Ok(tvec!(dense.into_tensor()))
            }
            InputLayout::Columns(columns) => columns
                .iter()
                .map(|column| {
                    let value = row
                        .get(&column.field)
                        .ok_or_else(|| ScoringError::MissingField(column.field.clone()))?;
                    column_tensor(&column.field, value, column.datum)
                })
                .collect(),
        }
    }
}

/// Classifier backed by an ONNX graph, planned once at load time.
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    layout: InputLayout,
}

impl OnnxClassifier {
    /// A graph with a single input is fed the whole row as a dense f32 vector.
    /// A graph with several inputs must name each one after a feature.
    pub fn load(path: impl AsRef<Path>, order: &FeatureOrder) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let proto = tract_onnx::onnx()
            .proto_model_for_path(path)
            .map_err(|e| onnx_error(path.display(), e))?;
        Self::build(&proto, order, &path.display().to_string())
    }

    /// Same as [`OnnxClassifier::load`] for a graph already decoded in memory.
    pub fn from_proto(proto: &ModelProto, order: &FeatureOrder) -> Result<Self, LoadError> {
        let origin = proto
            .graph
            .as_ref()
            .map(|graph| graph.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("in-memory graph")
            .to_string();
        Self::build(proto, order, &origin)
    }

    fn build(proto: &ModelProto, order: &FeatureOrder, origin: &str) -> Result<Self, LoadError> {
        let onnx_err = |e: TractError| onnx_error(origin, e);

        let mut model = tract_onnx::onnx()
            .model_for_proto_model(proto)
            .map_err(onnx_err)?;
        let input_count = model.input_outlets().map_err(onnx_err)?.len();

        if input_count == 1 {
            model = model
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, order.len())),
                )
                .map_err(onnx_err)?;
            let plan = model
                .into_optimized()
                .map_err(onnx_err)?
                .into_runnable()
                .map_err(onnx_err)?;
            return Ok(Self {
                plan,
                layout: InputLayout::Dense {
                    fields: order.names().to_vec(),
                },
            });
        }

        let typed = model.into_optimized().map_err(onnx_err)?;
        let mut columns = Vec::with_capacity(input_count);
        for (ix, outlet) in typed.input_outlets().map_err(onnx_err)?.iter().enumerate() {
            let field = typed.node(outlet.node).name.clone();
            if !order.contains(&field) {
                return Err(LoadError::UnknownInput(field));
            }
            let datum = typed.input_fact(ix).map_err(onnx_err)?.datum_type;
            if !is_supported_column(datum) {
                return Err(LoadError::UnsupportedInput {
                    field,
                    datum: format!("{datum:?}"),
                });
            }
            columns.push(ColumnInput { field, datum });
        }

        let plan = typed.into_runnable().map_err(onnx_err)?;
        Ok(Self {
            plan,
            layout: InputLayout::Columns(columns),
        })
    }

    /// Number of graph inputs the row is split across.
    pub fn input_count(&self) -> usize {
        match &self.layout {
            InputLayout::Dense { .. } => 1,
            InputLayout::Columns(columns) => columns.len(),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, row: &FeatureRow) -> Result<i64, ScoringError> {
        let inputs = self.layout.encode(row)?;
        let outputs = self
            .plan
            .run(inputs.into_iter().map(|t| t.into()).collect())
            .map_err(|e| ScoringError::Runtime(format!("{e:#}")))?;
        let first = outputs.first().ok_or(ScoringError::EmptyOutput)?;
        label_from_tensor(first)
    }
}

fn onnx_error(origin: impl std::fmt::Display, e: TractError) -> LoadError {
    LoadError::Onnx {
        origin: origin.to_string(),
        message: format!("{e:#}"),
    }
}

fn is_supported_column(datum: DatumType) -> bool {
    datum == DatumType::String || datum.is_integer() || datum.is_float()
}

/// Loose numeric reading of a JSON value: numbers, booleans, null (NaN)
/// and numeric strings.
fn coerce_number(field: &str, value: &Value) -> Result<f64, ScoringError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| ScoringError::NotNumeric {
            field: field.to_string(),
            value: n.to_string(),
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| ScoringError::NotNumeric {
            field: field.to_string(),
            value: s.clone(),
        }),
        Value::Array(_) => Err(ScoringError::NotScalar {
            field: field.to_string(),
            kind: "list",
        }),
        Value::Object(_) => Err(ScoringError::NotScalar {
            field: field.to_string(),
            kind: "object",
        }),
    }
}

fn column_tensor(field: &str, value: &Value, datum: DatumType) -> Result<Tensor, ScoringError> {
    let runtime = |e: TractError| ScoringError::Runtime(format!("{e:#}"));

    if datum == DatumType::String {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Ok(arr2(&[[text]]).into_tensor());
    }

    let number = coerce_number(field, value)?;
    let tensor = if datum.is_integer() {
        if !number.is_finite() || number.fract() != 0.0 {
            return Err(ScoringError::NotInteger {
                field: field.to_string(),
                value: number,
            });
        }
        arr2(&[[number as i64]]).into_tensor()
    } else {
        arr2(&[[number as f32]]).into_tensor()
    };
    if tensor.datum_type() == datum {
        Ok(tensor)
    } else {
        Ok(tensor.cast_to_dt(datum).map_err(runtime)?.into_owned())
    }
}

fn label_from_tensor(output: &Tensor) -> Result<i64, ScoringError> {
    let runtime = |e: TractError| ScoringError::Runtime(format!("{e:#}"));

    if output.datum_type().is_integer() {
        let labels = output.cast_to::<i64>().map_err(runtime)?;
        let labels = labels.as_slice::<i64>().map_err(runtime)?;
        return labels.first().copied().ok_or(ScoringError::EmptyOutput);
    }

    let scores = output.cast_to::<f32>().map_err(runtime)?;
    label_from_scores(scores.as_slice::<f32>().map_err(runtime)?)
}

/// A lone score is a positive-class probability; several are per-class scores.
fn label_from_scores(scores: &[f32]) -> Result<i64, ScoringError> {
    match scores {
        [] => Err(ScoringError::EmptyOutput),
        [p] => Ok(i64::from(*p >= 0.5)),
        _ => scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index as i64)
            .ok_or(ScoringError::EmptyOutput),
    }
}
