//! Cleaning plans for the four datasets.

use crate::schema::{Dataset, columns};

use super::config::{CleaningConfig, DedupStage};
use super::operations::TransformOperation;

/// Ordered cleaning steps for `dataset` under `config`.
pub fn plan(dataset: Dataset, config: &CleaningConfig) -> Vec<TransformOperation> {
    match dataset {
        Dataset::BranchSales => sales_plan(config, false),
        Dataset::OnlineSales => sales_plan(config, true),
        Dataset::Customers => customer_plan(config),
        Dataset::Inventory => inventory_plan(config),
    }
}

fn sales_plan(config: &CleaningConfig, online: bool) -> Vec<TransformOperation> {
    let mut steps = vec![
        TransformOperation::NormalizeTimestamps {
            column: columns::TIMESTAMP.to_string(),
        },
        TransformOperation::ImputeNumeric {
            column: columns::QUANTITY.to_string(),
            default: config.defaults.quantity,
        },
        TransformOperation::ImputeNumeric {
            column: columns::PRICE.to_string(),
            default: config.defaults.price,
        },
    ];
    if online {
        steps.push(TransformOperation::ImputeText {
            column: columns::DELIVERY_ADDRESS.to_string(),
            default: config.defaults.delivery_address.clone(),
        });
    }
    steps.push(TransformOperation::DeriveProduct {
        target: columns::TOTAL_SALE.to_string(),
        left: columns::QUANTITY.to_string(),
        right: columns::PRICE.to_string(),
    });
    // Sales always dedup after imputation.
    steps.push(TransformOperation::Deduplicate);
    steps
}

fn customer_plan(config: &CleaningConfig) -> Vec<TransformOperation> {
    let steps = vec![
        TransformOperation::Lowercase {
            column: columns::EMAIL.to_string(),
        },
        TransformOperation::ImputeText {
            column: columns::LOYALTY_STATUS.to_string(),
            default: config.defaults.loyalty_status.clone(),
        },
    ];
    with_dedup(steps, config.dedup_stage)
}

fn inventory_plan(config: &CleaningConfig) -> Vec<TransformOperation> {
    let steps = vec![
        TransformOperation::ImputeNumeric {
            column: columns::STOCK_LEVEL.to_string(),
            default: config.defaults.stock_level,
        },
        TransformOperation::ImputeNumeric {
            column: columns::REORDER_LEVEL.to_string(),
            default: config.defaults.reorder_level,
        },
        TransformOperation::DeriveLessThan {
            target: columns::REORDER_STATUS.to_string(),
            left: columns::STOCK_LEVEL.to_string(),
            right: columns::REORDER_LEVEL.to_string(),
        },
    ];
    with_dedup(steps, config.dedup_stage)
}

fn with_dedup(mut steps: Vec<TransformOperation>, stage: DedupStage) -> Vec<TransformOperation> {
    match stage {
        DedupStage::BeforeNormalization => steps.insert(0, TransformOperation::Deduplicate),
        DedupStage::AfterNormalization => steps.push(TransformOperation::Deduplicate),
    }
    steps
}
