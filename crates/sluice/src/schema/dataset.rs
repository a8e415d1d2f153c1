//! The four retail datasets and their column layouts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{ColumnSpec, ColumnType};

/// Column names shared by the dataset schemas and the cleaning plans.
pub mod columns {
    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const BRANCH_ID: &str = "branch_id";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const ITEM_ID: &str = "item_id";
    pub const TIMESTAMP: &str = "timestamp";
    pub const QUANTITY: &str = "quantity";
    pub const PRICE: &str = "price";
    pub const TOTAL_SALE: &str = "total_sale";
    pub const DELIVERY_ADDRESS: &str = "delivery_address";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const LOYALTY_STATUS: &str = "loyalty_status";
    pub const STOCK_LEVEL: &str = "stock_level";
    pub const REORDER_LEVEL: &str = "reorder_level";
    pub const REORDER_STATUS: &str = "reorder_status";
}

use columns::*;

const BRANCH_SALES: &[ColumnSpec] = &[
    ColumnSpec::raw(TRANSACTION_ID, ColumnType::Integer),
    ColumnSpec::raw(BRANCH_ID, ColumnType::Integer),
    ColumnSpec::required(TIMESTAMP, ColumnType::DateTime),
    ColumnSpec::raw(ITEM_ID, ColumnType::Integer),
    ColumnSpec::required(QUANTITY, ColumnType::Float),
    ColumnSpec::required(PRICE, ColumnType::Float),
    ColumnSpec::derived(TOTAL_SALE, ColumnType::Float),
];

const ONLINE_SALES: &[ColumnSpec] = &[
    ColumnSpec::raw(TRANSACTION_ID, ColumnType::Integer),
    ColumnSpec::raw(CUSTOMER_ID, ColumnType::Integer),
    ColumnSpec::required(TIMESTAMP, ColumnType::DateTime),
    ColumnSpec::raw(ITEM_ID, ColumnType::Integer),
    ColumnSpec::required(QUANTITY, ColumnType::Float),
    ColumnSpec::required(PRICE, ColumnType::Float),
    ColumnSpec::required(DELIVERY_ADDRESS, ColumnType::String),
    ColumnSpec::derived(TOTAL_SALE, ColumnType::Float),
];

const CUSTOMERS: &[ColumnSpec] = &[
    ColumnSpec::raw(CUSTOMER_ID, ColumnType::Integer),
    ColumnSpec::raw(NAME, ColumnType::String),
    ColumnSpec::raw(EMAIL, ColumnType::String),
    ColumnSpec::required(LOYALTY_STATUS, ColumnType::String),
];

const INVENTORY: &[ColumnSpec] = &[
    ColumnSpec::raw(ITEM_ID, ColumnType::Integer),
    ColumnSpec::raw(BRANCH_ID, ColumnType::Integer),
    ColumnSpec::required(STOCK_LEVEL, ColumnType::Float),
    ColumnSpec::required(REORDER_LEVEL, ColumnType::Float),
    ColumnSpec::derived(REORDER_STATUS, ColumnType::Boolean),
];

/// One of the four datasets handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    BranchSales,
    OnlineSales,
    Customers,
    Inventory,
}

impl Dataset {
    /// All datasets, in pipeline order.
    pub const ALL: [Dataset; 4] = [
        Dataset::BranchSales,
        Dataset::OnlineSales,
        Dataset::Customers,
        Dataset::Inventory,
    ];

    /// Destination table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            Dataset::BranchSales => "branch_sales",
            Dataset::OnlineSales => "online_sales",
            Dataset::Customers => "customer_data",
            Dataset::Inventory => "inventory_data",
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Dataset::BranchSales => "Branch sales",
            Dataset::OnlineSales => "Online sales",
            Dataset::Customers => "Customers",
            Dataset::Inventory => "Inventory",
        }
    }

    /// Column that identifies a row in warnings and audits.
    pub fn key_column(&self) -> &'static str {
        match self {
            Dataset::BranchSales | Dataset::OnlineSales => TRANSACTION_ID,
            Dataset::Customers => CUSTOMER_ID,
            Dataset::Inventory => ITEM_ID,
        }
    }

    /// Declared columns, in post-clean order.
    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Dataset::BranchSales => BRANCH_SALES,
            Dataset::OnlineSales => ONLINE_SALES,
            Dataset::Customers => CUSTOMERS,
            Dataset::Inventory => INVENTORY,
        }
    }

    /// Look up a declared column by name.
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|c| c.name == name)
    }

    /// Declared type of a column; undeclared columns are carried as text.
    pub fn column_type(&self, name: &str) -> ColumnType {
        self.column(name)
            .map(|c| c.column_type)
            .unwrap_or(ColumnType::String)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "branch_sales" | "branch" => Ok(Dataset::BranchSales),
            "online_sales" | "online" => Ok(Dataset::OnlineSales),
            "customers" | "customer_data" | "customer" => Ok(Dataset::Customers),
            "inventory" | "inventory_data" => Ok(Dataset::Inventory),
            _ => Err(format!(
                "Unknown dataset: {}. Use branch_sales, online_sales, customers or inventory.",
                s
            )),
        }
    }
}
