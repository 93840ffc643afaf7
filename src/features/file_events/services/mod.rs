mod reference_publisher;

pub use reference_publisher::FileReferencePublisher;
