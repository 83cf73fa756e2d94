pub mod error;
pub mod k8s;
pub mod operator;

pub use operator::crd::{Mesh, MeshSpec};
pub use operator::operator;
