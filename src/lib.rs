//! Block-matching motion estimation for a VP9 encoder.
//!
//! This crate is the encoder's windowed-search core: an exhaustive SAD
//! search over a rectangular displacement window, and a hierarchical
//! aggregator that folds one batch of 8 horizontal candidate displacements
//! into best-match state for every partition size of a 64x64 superblock at
//! once. Everything operates on caller-supplied padded [`Plane`]s; decoding,
//! mode decision, and the threaded encoder pipeline live elsewhere.
//!
//! The kernels are pure and reentrant. Parallel callers only need to keep
//! one [`SuperblockBestState`] per (superblock, reference) pair, which the
//! provided frame-level driver does by fanning superblock rows out on rayon.
//!
//! [`Plane`]: v_frame::plane::Plane

mod data;
mod estimate;

pub use v_frame;

pub use crate::{
    data::{
        block::{BlockOffset, BlockWidth, InvalidBlockWidth},
        motion::{
            MV_UNITS_PER_SAMPLE,
            MotionField,
            MotionVector,
            PartitionBest,
            SuperblockBestState,
        },
        plane::{Area, AsRegion, PlaneOffset, PlaneRegion, Rect},
        sad::get_sad,
        superblock::{SB_SIZE, SuperBlockOffset},
    },
    estimate::{
        EstimationError,
        MotionEstimationConfig,
        estimate_frame_motion,
        estimate_superblock_motion,
        exhaustive::{SearchResult, SearchWindow, exhaustive_search},
        hierarchy::{
            CANDIDATE_COUNT,
            CandidateRow,
            PartitionSadTable,
            aggregate_candidate_row,
        },
    },
};
