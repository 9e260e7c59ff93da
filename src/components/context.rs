//! Typed state threaded through the pipeline steps

use crate::config::Budget;
use crate::dataset::{ColumnBlocks, DatasetProperties};
use crate::error::{AutoNetError, Result};
use crate::nn::{BackboneSpec, EmbeddingSpec, HeadSpec, LrSchedule, Network, OptimizerSpec};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Column layout of the final feature matrix: categorical features first
/// (each possibly expanded by an encoder), then numerical columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub categorical_widths: Vec<usize>,
    pub numerical: usize,
}

impl FeatureLayout {
    pub fn width(&self) -> usize {
        self.categorical_widths.iter().sum::<usize>() + self.numerical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoaderSpec {
    pub batch_size: usize,
}

/// What the trainer reports back after a fit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: usize,
    pub train_loss: Vec<f64>,
    pub valid_loss: Vec<f64>,
    pub elapsed_secs: f64,
}

impl TrainingReport {
    pub fn final_train_loss(&self) -> Option<f64> {
        self.train_loss.last().copied()
    }
}

/// Per-fit state. Created fresh for every fit call; each step reads the
/// slots written by earlier steps and returns a [`ContextUpdate`].
#[derive(Debug, Clone)]
pub struct RunContext {
    pub dataset_properties: DatasetProperties,
    pub y_train: Array1<f64>,
    pub y_valid: Option<Array1<f64>>,
    pub budget: Budget,
    pub seed: u64,
    pub train_blocks: ColumnBlocks,
    pub valid_blocks: Option<ColumnBlocks>,
    pub layout: Option<FeatureLayout>,
    pub train_matrix: Option<Array2<f64>>,
    pub valid_matrix: Option<Array2<f64>>,
    pub embedding: Option<EmbeddingSpec>,
    pub backbone: Option<BackboneSpec>,
    pub head: Option<HeadSpec>,
    pub network: Option<Network>,
    pub optimizer: Option<OptimizerSpec>,
    pub lr_scheduler: Option<LrSchedule>,
    pub data_loader: Option<LoaderSpec>,
    pub training_report: Option<TrainingReport>,
}

impl RunContext {
    /// Split the validated matrices into column blocks per the dataset properties
    pub fn new(
        dataset_properties: DatasetProperties,
        x_train: &Array2<f64>,
        y_train: Array1<f64>,
        valid: Option<(&Array2<f64>, Array1<f64>)>,
        budget: Budget,
        seed: u64,
    ) -> Result<Self> {
        let categorical = dataset_properties.require_categorical_columns()?.to_vec();
        let numerical = dataset_properties.require_numerical_columns()?.to_vec();
        let train_blocks = ColumnBlocks::split(x_train, &categorical, &numerical)?;
        let (valid_blocks, y_valid) = match valid {
            Some((x, y)) => (Some(ColumnBlocks::split(x, &categorical, &numerical)?), Some(y)),
            None => (None, None),
        };
        Ok(Self {
            dataset_properties,
            y_train,
            y_valid,
            budget,
            seed,
            train_blocks,
            valid_blocks,
            layout: None,
            train_matrix: None,
            valid_matrix: None,
            embedding: None,
            backbone: None,
            head: None,
            network: None,
            optimizer: None,
            lr_scheduler: None,
            data_loader: None,
            training_report: None,
        })
    }

    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(v) = update.train_blocks {
            self.train_blocks = v;
        }
        if update.valid_blocks.is_some() {
            self.valid_blocks = update.valid_blocks;
        }
        if update.layout.is_some() {
            self.layout = update.layout;
        }
        if update.train_matrix.is_some() {
            self.train_matrix = update.train_matrix;
        }
        if update.valid_matrix.is_some() {
            self.valid_matrix = update.valid_matrix;
        }
        if update.embedding.is_some() {
            self.embedding = update.embedding;
        }
        if update.backbone.is_some() {
            self.backbone = update.backbone;
        }
        if update.head.is_some() {
            self.head = update.head;
        }
        if update.network.is_some() {
            self.network = update.network;
        }
        if update.optimizer.is_some() {
            self.optimizer = update.optimizer;
        }
        if update.lr_scheduler.is_some() {
            self.lr_scheduler = update.lr_scheduler;
        }
        if update.data_loader.is_some() {
            self.data_loader = update.data_loader;
        }
        if update.training_report.is_some() {
            self.training_report = update.training_report;
        }
    }

    fn missing(slot: &str) -> AutoNetError {
        AutoNetError::configuration(format!(
            "run context has no {}; the step producing it has not run",
            slot
        ))
    }

    pub fn require_layout(&self) -> Result<&FeatureLayout> {
        self.layout.as_ref().ok_or_else(|| Self::missing("feature layout"))
    }

    pub fn require_train_matrix(&self) -> Result<&Array2<f64>> {
        self.train_matrix.as_ref().ok_or_else(|| Self::missing("training matrix"))
    }

    pub fn require_backbone(&self) -> Result<&BackboneSpec> {
        self.backbone.as_ref().ok_or_else(|| Self::missing("backbone"))
    }

    pub fn require_head(&self) -> Result<&HeadSpec> {
        self.head.as_ref().ok_or_else(|| Self::missing("head"))
    }

    pub fn require_network(&self) -> Result<&Network> {
        self.network.as_ref().ok_or_else(|| Self::missing("network"))
    }

    pub fn require_optimizer(&self) -> Result<&OptimizerSpec> {
        self.optimizer.as_ref().ok_or_else(|| Self::missing("optimizer"))
    }

    pub fn require_data_loader(&self) -> Result<&LoaderSpec> {
        self.data_loader.as_ref().ok_or_else(|| Self::missing("data loader"))
    }
}

/// Output of one step's `fit`; `None` slots leave the context untouched
#[derive(Debug, Clone, Default)]
pub struct ContextUpdate {
    pub train_blocks: Option<ColumnBlocks>,
    pub valid_blocks: Option<ColumnBlocks>,
    pub layout: Option<FeatureLayout>,
    pub train_matrix: Option<Array2<f64>>,
    pub valid_matrix: Option<Array2<f64>>,
    pub embedding: Option<EmbeddingSpec>,
    pub backbone: Option<BackboneSpec>,
    pub head: Option<HeadSpec>,
    pub network: Option<Network>,
    pub optimizer: Option<OptimizerSpec>,
    pub lr_scheduler: Option<LrSchedule>,
    pub data_loader: Option<LoaderSpec>,
    pub training_report: Option<TrainingReport>,
}

impl ContextUpdate {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Inference-time state passed through the fitted steps
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    pub blocks: Option<ColumnBlocks>,
    pub matrix: Option<Array2<f64>>,
    /// Network outputs, filled by the trainer step
    pub outputs: Option<Array2<f64>>,
}

impl TransformContext {
    pub fn new(blocks: ColumnBlocks) -> Self {
        Self {
            blocks: Some(blocks),
            matrix: None,
            outputs: None,
        }
    }

    pub fn take_blocks(&mut self) -> Result<ColumnBlocks> {
        self.blocks
            .take()
            .ok_or_else(|| AutoNetError::configuration("transform context has no column blocks"))
    }

    pub fn take_matrix(&mut self) -> Result<Array2<f64>> {
        self.matrix
            .take()
            .ok_or_else(|| AutoNetError::configuration("transform context has no feature matrix"))
    }
}
