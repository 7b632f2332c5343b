pub mod dualsense;
pub mod orbis_pad;
