//! Whole-pipeline tests spanning bodies, spatial index, narrow phase and tick loop
