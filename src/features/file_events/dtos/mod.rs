mod event_dto;

pub use event_dto::{
    AcceptedEventsDto, PublishFileEventDto, PublishFileEventsBatchDto, MAX_BATCH_EVENTS,
};
