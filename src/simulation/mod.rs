pub mod states;
pub mod params;
pub mod geometry;
pub mod quadtree;
pub mod partition;
pub mod forces;
pub mod integrator;
pub mod halo;
pub mod driver;
