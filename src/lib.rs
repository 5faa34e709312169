pub mod simulation;
pub mod configuration;
pub mod transport;
pub mod io;
pub mod benchmark;

pub use simulation::states::{Particle, Vec2f};
pub use simulation::geometry::{box_distance2, box_point_distance, Box2};
pub use simulation::quadtree::{QuadTree, LEAF_CAPACITY};
pub use simulation::partition::PartitionGrid;
pub use simulation::params::{benchmark_step_params, StepParameters, COORDINATOR};
pub use simulation::driver::{run_simulation, RunSettings, SimError};
pub use simulation::forces::compute_force;
pub use simulation::integrator::update_particle;

pub use configuration::config::{RunConfig, RunConfigFile};

pub use transport::local::{LocalCluster, LocalEndpoint};
pub use transport::{Transport, TransportError};

pub use benchmark::benchmark::{bench_quadtree, bench_step};
