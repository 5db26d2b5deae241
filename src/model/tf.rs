use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};

use super::{PredictError, Regressor};

const INPUT_OP: &str = "features";
const OUTPUT_OP: &str = "Identity";

struct Loaded {
    session: Session,
    graph: Graph,
}

/// Regressor backed by a frozen TensorFlow graph taking a `[1, n]` float row.
pub struct TfRegressor {
    inner: Mutex<Loaded>,
}

impl TfRegressor {
    pub fn load(model_path: &Path) -> Result<Self, PredictError> {
        let load_err = |reason: String| PredictError::ModelLoad {
            path: model_path.to_path_buf(),
            reason,
        };

        let mut graph = Graph::new();
        let mut model_bytes = Vec::new();
        File::open(model_path)
            .and_then(|mut f| f.read_to_end(&mut model_bytes))
            .map_err(|source| PredictError::Io {
                path: model_path.to_path_buf(),
                source,
            })?;

        graph
            .import_graph_def(&model_bytes, &ImportGraphDefOptions::new())
            .map_err(|e| load_err(e.to_string()))?;
        let session =
            Session::new(&SessionOptions::new(), &graph).map_err(|e| load_err(e.to_string()))?;

        Ok(Self {
            inner: Mutex::new(Loaded { session, graph }),
        })
    }
}

impl Regressor for TfRegressor {
    fn predict(&self, row: &[f32]) -> Result<f64, PredictError> {
        let inference = |e: tensorflow::Status| PredictError::Inference(e.to_string());
        let loaded = self
            .inner
            .lock()
            .map_err(|_| PredictError::Inference("session lock poisoned".into()))?;

        let mut input = Tensor::new(&[1, row.len() as u64]);
        input.copy_from_slice(row);

        let input_operation = loaded
            .graph
            .operation_by_name(INPUT_OP)
            .map_err(inference)?
            .ok_or_else(|| PredictError::Inference(format!("input operation '{INPUT_OP}' not found in graph")))?;
        let output_operation = loaded
            .graph
            .operation_by_name(OUTPUT_OP)
            .map_err(inference)?
            .ok_or_else(|| PredictError::Inference(format!("output operation '{OUTPUT_OP}' not found in graph")))?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input_operation, 0, &input);
        let output_token = args.request_fetch(&output_operation, 0);
        loaded.session.run(&mut args).map_err(inference)?;

        let output: Tensor<f32> = args.fetch(output_token).map_err(inference)?;
        output
            .first()
            .map(|&v| v as f64)
            .ok_or_else(|| PredictError::Inference("model returned no prediction".into()))
    }
}
