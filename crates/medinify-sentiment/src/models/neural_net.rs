//! Feed-forward network over dense presence vectors, trained with candle.

use std::fmt;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Dropout, Linear, Module, Optimizer, VarBuilder, VarMap};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::data_handling::{Dataset, Label};
use crate::error::{Result, SentimentError};
use crate::models::classifier_trait::{numeric_dataset, numeric_features, ClassifierModel, Features};

/// Seed for the per-epoch shuffle of training rows.
const SHUFFLE_SEED: u64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetParams {
    pub hidden_layers: Vec<usize>,
    pub dropout: f32,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Loss weights as (negative, positive).
    pub class_weights: (f32, f32),
}

impl Default for NeuralNetParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![20, 30, 20],
            dropout: 0.5,
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            class_weights: (3.0, 1.0),
        }
    }
}

/// ReLU hidden layers with dropout, single logit output.
struct FeedForward {
    hidden: Vec<Linear>,
    output: Linear,
    dropout: Dropout,
}

impl FeedForward {
    fn new(
        vb: &VarBuilder,
        n_inputs: usize,
        hidden_layers: &[usize],
        dropout: f32,
    ) -> candle_core::Result<Self> {
        let mut hidden = Vec::with_capacity(hidden_layers.len());
        let mut in_dim = n_inputs;
        for (i, &width) in hidden_layers.iter().enumerate() {
            hidden.push(candle_nn::linear(in_dim, width, vb.pp(format!("hidden{}", i)))?);
            in_dim = width;
        }
        let output = candle_nn::linear(in_dim, 1, vb.pp("output"))?;
        Ok(Self {
            hidden,
            output,
            dropout: Dropout::new(dropout),
        })
    }

    /// Logits of shape `(batch,)`.
    fn forward(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let mut x = xs.clone();
        for layer in &self.hidden {
            x = layer.forward(&x)?.relu()?;
            x = self.dropout.forward(&x, train)?;
        }
        self.output.forward(&x)?.squeeze(1)
    }
}

/// Mean of `w * (max(z, 0) - z * y + ln(1 + exp(-|z|)))`.
fn weighted_bce_with_logits(
    logits: &Tensor,
    targets: &Tensor,
    weights: &Tensor,
) -> candle_core::Result<Tensor> {
    let softplus = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    let per_row = logits.relu()?.sub(&logits.mul(targets)?)?.add(&softplus)?;
    per_row.mul(weights)?.mean_all()
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

struct Network {
    varmap: VarMap,
    model: FeedForward,
    n_features: usize,
}

impl Network {
    fn untrained(params: &NeuralNetParams, n_features: usize, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = FeedForward::new(&vb, n_features, &params.hidden_layers, params.dropout)?;
        Ok(Self {
            varmap,
            model,
            n_features,
        })
    }
}

/// One named weight tensor, flattened row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorState {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Serializable snapshot of a trained network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetState {
    pub params: NeuralNetParams,
    pub n_features: usize,
    pub tensors: Vec<TensorState>,
}

pub struct NeuralNetClassifier {
    params: NeuralNetParams,
    device: Device,
    network: Option<Network>,
}

impl fmt::Debug for NeuralNetClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuralNetClassifier")
            .field("params", &self.params)
            .field("n_features", &self.network.as_ref().map(|n| n.n_features))
            .finish()
    }
}

impl NeuralNetClassifier {
    pub fn new(params: NeuralNetParams) -> Self {
        Self {
            params,
            device: Device::Cpu,
            network: None,
        }
    }

    pub fn params(&self) -> &NeuralNetParams {
        &self.params
    }

    fn network(&self) -> Result<&Network> {
        self.network
            .as_ref()
            .ok_or(SentimentError::ModelUnavailable(ClassifierFamily::NeuralNet))
    }

    /// Snapshot the trained weights.
    pub fn to_state(&self) -> Result<NeuralNetState> {
        let network = self.network()?;
        let vars = network
            .varmap
            .data()
            .lock()
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

        let mut tensors = Vec::with_capacity(vars.len());
        for (name, var) in vars.iter() {
            tensors.push(TensorState {
                name: name.clone(),
                shape: var.dims().to_vec(),
                data: var.flatten_all()?.to_vec1::<f32>()?,
            });
        }
        tensors.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(NeuralNetState {
            params: self.params.clone(),
            n_features: network.n_features,
            tensors,
        })
    }

    /// Rebuild the network and overwrite its weights from a snapshot.
    pub fn from_state(state: NeuralNetState) -> Result<Self> {
        let device = Device::Cpu;
        let mut network = Network::untrained(&state.params, state.n_features, &device)?;
        for tensor in state.tensors {
            let value = Tensor::from_vec(tensor.data, tensor.shape.as_slice(), &device)?;
            network.varmap.set_one(&tensor.name, value)?;
        }
        Ok(Self {
            params: state.params,
            device,
            network: Some(network),
        })
    }
}

impl Default for NeuralNetClassifier {
    fn default() -> Self {
        Self::new(NeuralNetParams::default())
    }
}

impl ClassifierModel for NeuralNetClassifier {
    fn family(&self) -> ClassifierFamily {
        ClassifierFamily::NeuralNet
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let data = numeric_dataset(self.family(), dataset)?;
        let (n_samples, n_features) = data.features.dim();
        let network = Network::untrained(&self.params, n_features, &self.device)?;

        let xs = Tensor::from_vec(
            data.features.iter().copied().collect::<Vec<f32>>(),
            (n_samples, n_features),
            &self.device,
        )?;
        let (neg_weight, pos_weight) = self.params.class_weights;
        let targets: Vec<f32> = data.labels.iter().map(|l| l.encode() as f32).collect();
        let weights: Vec<f32> = data
            .labels
            .iter()
            .map(|l| match l {
                Label::Negative => neg_weight,
                Label::Positive => pos_weight,
            })
            .collect();
        let ys = Tensor::from_vec(targets, n_samples, &self.device)?;
        let ws = Tensor::from_vec(weights, n_samples, &self.device)?;

        let params = candle_nn::ParamsAdamW {
            lr: self.params.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut opt = candle_nn::AdamW::new(network.varmap.all_vars(), params)?;

        let batch_size = self.params.batch_size.max(1);
        let num_batches = n_samples.div_ceil(batch_size);
        log::info!(
            "Training neural net on {} rows x {} features ({} batches) for {} epochs",
            n_samples,
            n_features,
            num_batches,
            self.params.epochs
        );

        let mut rng = ChaCha8Rng::seed_from_u64(SHUFFLE_SEED);
        let mut order: Vec<u32> = (0..n_samples as u32).collect();
        for epoch in 0..self.params.epochs {
            order.shuffle(&mut rng);
            let mut total_loss = 0.0f32;
            for batch in order.chunks(batch_size) {
                let idx = Tensor::from_slice(batch, batch.len(), &self.device)?;
                let logits = network.model.forward(&xs.index_select(&idx, 0)?, true)?;
                let loss = weighted_bce_with_logits(
                    &logits,
                    &ys.index_select(&idx, 0)?,
                    &ws.index_select(&idx, 0)?,
                )?;
                opt.backward_step(&loss)?;
                total_loss += loss.to_scalar::<f32>()?;
            }
            if (epoch + 1) % 10 == 0 {
                log::debug!(
                    "[NeuralNet] Epoch {}: Avg. Batch Loss: {:.4}",
                    epoch + 1,
                    total_loss / num_batches as f32
                );
            }
        }

        self.network = Some(network);
        Ok(())
    }

    fn predict_proba(&self, features: &Features) -> Result<Vec<f32>> {
        let rows = numeric_features(self.family(), features)?;
        let network = self.network()?;
        if rows.ncols() != network.n_features {
            return Err(SentimentError::InvalidConfig(format!(
                "expected {} features, got {}",
                network.n_features,
                rows.ncols()
            )));
        }
        if rows.nrows() == 0 {
            return Ok(Vec::new());
        }

        let xs = Tensor::from_vec(
            rows.iter().copied().collect::<Vec<f32>>(),
            (rows.nrows(), rows.ncols()),
            &self.device,
        )?;
        let logits = network.model.forward(&xs, false)?.to_vec1::<f32>()?;
        Ok(logits.into_iter().map(sigmoid).collect())
    }

    fn is_trained(&self) -> bool {
        self.network.is_some()
    }

    fn name(&self) -> &str {
        "neural_net"
    }
}
