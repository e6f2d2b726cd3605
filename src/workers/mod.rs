/// Background extraction work for the filmstrip
pub mod thumbnail_worker;

pub use thumbnail_worker::{
    Deliver, SampleTimestamp, StripUpdate, Thumbnail, ThumbnailBatchGenerator, ThumbnailOutcome,
    ThumbnailStrip, sample_timestamps,
};
