pub mod prepare_env;
pub mod seed;
