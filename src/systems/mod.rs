mod growth;

pub use growth::GrowthSystem;
