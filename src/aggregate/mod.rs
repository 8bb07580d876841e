//! Population-weighted rollups: county hesitancy to states, states to the
//! national weekly series.

pub mod hesitancy;
pub mod national;
pub mod utility;

pub use hesitancy::{StateHesitancy, aggregate_hesitancy};
pub use national::NationalAggregator;
