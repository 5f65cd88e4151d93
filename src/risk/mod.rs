pub mod solvency;
