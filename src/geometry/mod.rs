mod circular_list;
mod edge;
mod outline;

pub use circular_list::{CircularList, NodeId};
pub use edge::{Curve, Edge, VertexIndex};
pub use outline::{Contour, Orientation, Outline};
