//! Tabular preprocessing components
//!
//! Every component here fits on the column blocks of the run context and
//! returns the transformed train/validation blocks:
//! - Imputation of missing values
//! - Coalescing of rare categories
//! - Categorical encoding (one-hot, ordinal)
//! - Numerical scaling and polynomial expansion
//! - Final matrix assembly

mod coalescer;
mod column_transformer;
mod early_preprocessing;
mod encoder;
mod feature_preprocessor;
mod imputer;
mod scaler;

pub use coalescer::{MinorityCoalescer, NoCoalescer};
pub use column_transformer::TabularColumnTransformer;
pub use early_preprocessing::EarlyPreprocessing;
pub use encoder::{NoEncoder, OneHotEncoder, OrdinalEncoder};
pub use feature_preprocessor::{NoFeaturePreprocessor, PolynomialFeatures};
pub use imputer::{CategoricalStrategy, NumericalStrategy, SimpleImputer};
pub use scaler::{MinMaxScaler, NoScaler, NormKind, Normalizer, StandardScaler};

use super::context::{ContextUpdate, RunContext, TransformContext};
use crate::dataset::ColumnBlocks;
use crate::error::{AutoNetError, Result};
use ndarray::ArrayView1;
use std::collections::HashMap;

/// Block-level fit/transform shared by the preprocessing components
pub(crate) trait BlockTransform {
    fn fit_blocks(&mut self, blocks: &ColumnBlocks) -> Result<()>;

    fn transform_blocks(&self, blocks: ColumnBlocks) -> Result<ColumnBlocks>;
}

/// Fit on the training blocks and transform both train and validation blocks
pub(crate) fn fit_on_context<T: BlockTransform>(transformer: &mut T, context: &RunContext) -> Result<ContextUpdate> {
    transformer.fit_blocks(&context.train_blocks)?;
    let train = transformer.transform_blocks(context.train_blocks.clone())?;
    let valid = context
        .valid_blocks
        .as_ref()
        .map(|b| transformer.transform_blocks(b.clone()))
        .transpose()?;
    Ok(ContextUpdate {
        train_blocks: Some(train),
        valid_blocks: valid,
        ..ContextUpdate::none()
    })
}

pub(crate) fn transform_context<T: BlockTransform>(
    transformer: &T,
    is_fitted: bool,
    name: &str,
    mut context: TransformContext,
) -> Result<TransformContext> {
    if !is_fitted {
        return Err(AutoNetError::not_fitted(name));
    }
    let blocks = context.take_blocks()?;
    context.blocks = Some(transformer.transform_blocks(blocks)?);
    Ok(context)
}

/// Most frequent finite value; ties go to the smallest value
pub(crate) fn most_frequent(column: ArrayView1<f64>) -> Option<f64> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in column.iter().filter(|v| v.is_finite()) {
        counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
    }
    counts
        .into_values()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.total_cmp(&a.0)))
        .map(|(v, _)| v)
}

/// Sorted distinct finite values
pub(crate) fn distinct_values(column: ArrayView1<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_most_frequent_breaks_ties_low() {
        let col = array![3.0, 1.0, 3.0, 1.0, f64::NAN, 2.0];
        assert_eq!(most_frequent(col.view()), Some(1.0));
        assert_eq!(most_frequent(array![f64::NAN].view()), None);
    }

    #[test]
    fn test_distinct_values_sorted() {
        assert_eq!(distinct_values(array![2.0, -1.0, 2.0, 0.0].view()), vec![-1.0, 0.0, 2.0]);
    }
}
