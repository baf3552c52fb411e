pub mod audio_mixer;
