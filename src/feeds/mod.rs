pub mod price_path;
