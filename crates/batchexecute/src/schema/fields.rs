// Standard field positions, per record kind.
//
// Positions track the live storefront payload and drift as the site evolves;
// a field that stops resolving degrades to its fallback rather than failing
// the record.

use super::{FieldSet, FieldSpec, Transform};
use crate::value::Value;

/// Main app payload chunk on detail pages.
const APP: usize = 5;
/// Discount / sale chunk.
const SALE: usize = 4;
/// Original-price chunk.
const PRICING: usize = 3;
/// Featured comments chunk.
const COMMENTS: usize = 8;

/// Full description HTML; older listings leave it empty and only publish
/// the short one.
const DESCRIPTION: &[usize] = &[1, 2, 12, 0, 0, 1];
const SHORT_DESCRIPTION: &[usize] = &[1, 2, 72, 0, 1];

pub(super) fn detail() -> FieldSet {
    let empty_list = || Value::Array(Vec::new());
    let micro_price =
        |chunk, path: &[usize]| FieldSpec::in_chunk(chunk, path).transform(Transform::MicroPrice);
    let price_path: &[usize] = &[1, 2, 57, 0, 0, 0, 0, 1, 0, 0];

    FieldSet::from([
        ("title", FieldSpec::in_chunk(APP, &[1, 2, 0, 0])),
        (
            "description",
            FieldSpec::in_chunk(APP, DESCRIPTION)
                .transform(Transform::UnescapeText)
                .blank_is_missing()
                .or_spec(
                    FieldSpec::in_chunk(APP, SHORT_DESCRIPTION).transform(Transform::UnescapeText),
                ),
        ),
        (
            "descriptionHTML",
            FieldSpec::in_chunk(APP, DESCRIPTION)
                .blank_is_missing()
                .or_spec(FieldSpec::in_chunk(APP, SHORT_DESCRIPTION)),
        ),
        (
            "summary",
            FieldSpec::in_chunk(APP, &[1, 2, 73, 0, 1]).transform(Transform::UnescapeText),
        ),
        ("installs", FieldSpec::in_chunk(APP, &[1, 2, 13, 0])),
        ("minInstalls", FieldSpec::in_chunk(APP, &[1, 2, 13, 1])),
        ("realInstalls", FieldSpec::in_chunk(APP, &[1, 2, 13, 2])),
        ("score", FieldSpec::in_chunk(APP, &[1, 2, 51, 0, 1])),
        ("ratings", FieldSpec::in_chunk(APP, &[1, 2, 51, 2, 1])),
        ("reviews", FieldSpec::in_chunk(APP, &[1, 2, 51, 3, 1])),
        (
            "histogram",
            FieldSpec::in_chunk(APP, &[1, 2, 51, 1])
                .transform(Transform::Histogram)
                .or_value(Value::Array(vec![Value::Number(0.0); 5])),
        ),
        ("price", micro_price(APP, price_path)),
        (
            "free",
            FieldSpec::in_chunk(APP, price_path).transform(Transform::FreeFlag),
        ),
        ("currency", FieldSpec::in_chunk(APP, &[1, 2, 57, 0, 0, 0, 0, 1, 0, 1])),
        (
            "sale",
            FieldSpec::in_chunk(SALE, &[0, 2, 0, 0, 0, 14, 0, 0])
                .transform(Transform::Truthy)
                .or_value(false),
        ),
        ("saleTime", FieldSpec::in_chunk(SALE, &[0, 2, 0, 0, 0, 14, 0, 0])),
        ("originalPrice", micro_price(PRICING, &[0, 2, 0, 0, 0, 1, 1, 0])),
        ("saleText", FieldSpec::in_chunk(SALE, &[0, 2, 0, 0, 0, 14, 1])),
        (
            "offersIAP",
            FieldSpec::in_chunk(APP, &[1, 2, 19, 0])
                .transform(Transform::Truthy)
                .or_value(false),
        ),
        ("inAppProductPrice", FieldSpec::in_chunk(APP, &[1, 2, 19, 0])),
        ("developer", FieldSpec::in_chunk(APP, &[1, 2, 68, 0])),
        (
            "developerId",
            FieldSpec::in_chunk(APP, &[1, 2, 68, 1, 4, 2]).transform(Transform::DeveloperId),
        ),
        ("developerEmail", FieldSpec::in_chunk(APP, &[1, 2, 69, 1, 0])),
        ("developerWebsite", FieldSpec::in_chunk(APP, &[1, 2, 69, 0, 5, 2])),
        ("developerAddress", FieldSpec::in_chunk(APP, &[1, 2, 69, 2, 0])),
        ("privacyPolicy", FieldSpec::in_chunk(APP, &[1, 2, 99, 0, 5, 2])),
        ("genre", FieldSpec::in_chunk(APP, &[1, 2, 79, 0, 0, 0])),
        ("genreId", FieldSpec::in_chunk(APP, &[1, 2, 79, 0, 0, 2])),
        (
            "categories",
            FieldSpec::in_chunk(APP, &[1, 2])
                .transform(Transform::Categories)
                .or_value(empty_list()),
        ),
        ("icon", FieldSpec::in_chunk(APP, &[1, 2, 95, 0, 3, 2])),
        ("headerImage", FieldSpec::in_chunk(APP, &[1, 2, 96, 0, 3, 2])),
        (
            "screenshots",
            FieldSpec::in_chunk(APP, &[1, 2, 78, 0])
                .transform(Transform::Screenshots)
                .or_value(empty_list()),
        ),
        ("video", FieldSpec::in_chunk(APP, &[1, 2, 100, 0, 0, 3, 2])),
        ("videoImage", FieldSpec::in_chunk(APP, &[1, 2, 100, 1, 0, 3, 2])),
        ("contentRating", FieldSpec::in_chunk(APP, &[1, 2, 9, 0])),
        ("contentRatingDescription", FieldSpec::in_chunk(APP, &[1, 2, 9, 2, 1])),
        (
            "adSupported",
            FieldSpec::in_chunk(APP, &[1, 2, 48]).transform(Transform::Truthy),
        ),
        (
            "containsAds",
            FieldSpec::in_chunk(APP, &[1, 2, 48])
                .transform(Transform::Truthy)
                .or_value(false),
        ),
        ("released", FieldSpec::in_chunk(APP, &[1, 2, 10, 0])),
        ("lastUpdatedOn", FieldSpec::in_chunk(APP, &[1, 2, 145, 0, 0])),
        ("updated", FieldSpec::in_chunk(APP, &[1, 2, 145, 0, 1, 0])),
        (
            "version",
            FieldSpec::in_chunk(APP, &[1, 2, 140, 0, 0, 0]).or_value("Varies with device"),
        ),
        (
            "comments",
            FieldSpec::in_chunk(COMMENTS, &[0])
                .transform(Transform::Comments)
                .or_value(empty_list()),
        ),
    ])
}

pub(super) fn review() -> FieldSet {
    FieldSet::from([
        ("reviewId", FieldSpec::at(&[0])),
        ("userName", FieldSpec::at(&[1, 0])),
        ("userImage", FieldSpec::at(&[1, 1, 3, 2])),
        ("content", FieldSpec::at(&[4])),
        ("score", FieldSpec::at(&[2])),
        ("thumbsUpCount", FieldSpec::at(&[6])),
        ("reviewCreatedVersion", FieldSpec::at(&[10])),
        ("at", FieldSpec::at(&[5, 0]).transform(Transform::EpochToIso)),
        ("replyContent", FieldSpec::at(&[7, 1])),
        ("repliedAt", FieldSpec::at(&[7, 2, 0]).transform(Transform::EpochToIso)),
        ("appVersion", FieldSpec::at(&[10]).or_value("")),
    ])
}

pub(super) fn permission() -> FieldSet {
    FieldSet::from([
        ("type", FieldSpec::at(&[0])),
        (
            "permissions",
            FieldSpec::at(&[2]).transform(Transform::SortedNames).or_value(Value::Array(Vec::new())),
        ),
    ])
}

/// Fields of one search hit list entry; the app sits at `[0]`.
pub(super) fn search_result() -> FieldSet {
    let price: &[usize] = &[0, 8, 1, 0, 0];
    FieldSet::from([
        ("appId", FieldSpec::at(&[0, 0, 0])),
        ("icon", FieldSpec::at(&[0, 1, 3, 2])),
        (
            "screenshots",
            FieldSpec::at(&[0, 2])
                .transform(Transform::Screenshots)
                .or_value(Value::Array(Vec::new())),
        ),
        ("title", FieldSpec::at(&[0, 3])),
        ("score", FieldSpec::at(&[0, 4, 1])),
        ("genre", FieldSpec::at(&[0, 5])),
        ("price", FieldSpec::at(price).transform(Transform::MicroPrice)),
        ("free", FieldSpec::at(price).transform(Transform::FreeFlag)),
        ("currency", FieldSpec::at(&[0, 8, 1, 0, 1])),
        ("video", FieldSpec::at(&[0, 12, 0, 0, 3, 2])),
        ("videoImage", FieldSpec::at(&[0, 12, 0, 3, 3, 2])),
        (
            "description",
            FieldSpec::at(&[0, 13, 1]).transform(Transform::UnescapeText),
        ),
        ("descriptionHTML", FieldSpec::at(&[0, 13, 1])),
        ("developer", FieldSpec::at(&[0, 14])),
        ("installs", FieldSpec::at(&[0, 15])),
    ])
}

/// Fields of the highlighted top search result, laid out like a detail
/// payload without its chunk wrapper.
pub(super) fn top_search_result() -> FieldSet {
    let price: &[usize] = &[2, 57, 0, 0, 0, 0, 1, 0, 0];
    FieldSet::from([
        ("appId", FieldSpec::at(&[11, 0, 0])),
        ("icon", FieldSpec::at(&[2, 95, 0, 3, 2])),
        (
            "screenshots",
            FieldSpec::at(&[2, 78, 0])
                .transform(Transform::Screenshots)
                .or_value(Value::Array(Vec::new())),
        ),
        ("title", FieldSpec::at(&[2, 0, 0])),
        ("score", FieldSpec::at(&[2, 51, 0, 1])),
        ("genre", FieldSpec::at(&[2, 79, 0, 0, 0])),
        ("price", FieldSpec::at(price).transform(Transform::MicroPrice)),
        ("free", FieldSpec::at(price).transform(Transform::FreeFlag)),
        ("currency", FieldSpec::at(&[2, 57, 0, 0, 0, 0, 1, 0, 1])),
        ("video", FieldSpec::at(&[2, 100, 0, 0, 3, 2])),
        ("videoImage", FieldSpec::at(&[2, 100, 1, 0, 3, 2])),
        (
            "description",
            FieldSpec::at(&[2, 72, 0, 1]).transform(Transform::UnescapeText),
        ),
        ("descriptionHTML", FieldSpec::at(&[2, 72, 0, 1])),
        ("developer", FieldSpec::at(&[2, 68, 0])),
        ("installs", FieldSpec::at(&[2, 13, 0])),
    ])
}
