//! The batchexecute protocol codec, in both directions.
//!
//! | Module | Direction |
//! |--------|-----------|
//! | [`request`] | URLs and `f.req` bodies; encode for the client, decode for the mock |
//! | [`response`] | framing strip and chunk location for reviews, permissions, detail and search pages; decode for the client |
//! | [`wire`] | response bodies; encode for the mock and fixtures |
//!
//! Client and mock share this one module, so a change to a payload position
//! is made once and both sides follow.

pub mod request;
pub mod response;
pub mod wire;

pub use request::{
    batchexecute_url, detail_fallback_url, detail_url, search_fallback_url, search_url,
    BatchRequest, ReviewsRequest, BATCHEXECUTE_PATH, DETAILS_PATH, FORM_CONTENT_TYPE,
    PERMISSIONS_RPC, REVIEWS_RPC, SEARCH_PATH,
};
pub use response::{
    decode_detail_page, decode_permissions, decode_reviews, decode_search_page, strip_guard,
    ReviewPage, SearchPage, GUARD_PREFIX, RATE_LIMIT_MARKER,
};
pub use wire::{
    encode_detail_page, encode_permissions_response, encode_reviews_response, encode_search_page,
};
