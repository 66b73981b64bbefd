use url::Url;

/// Query parameter the analysis API reads a simulated timestamp from.
pub const TEST_DATE_PARAM: &str = "test_date";

/// Target URL for one descriptor: the base URL, plus `test_date` when the
/// descriptor carries a date. Query parameters already on the base URL are
/// kept.
pub fn build_target_url(base: &Url, date: Option<&str>) -> Url {
    let mut url = base.clone();
    if let Some(date) = date {
        url.query_pairs_mut().append_pair(TEST_DATE_PARAM, date);
    }
    url
}
