// Reference and value tools
pub mod reference;
pub mod types;
pub mod value;

// Grant convergence
pub mod grants;
