pub mod ring_buffer;
pub mod sample_mixer;
pub mod software_mixer;
