//! The URL-keyed response cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use netkit_httpproto::{split_value, Request, Response};

/// One cached response and the moment it stops being valid.
struct Entry {
    response: Response,
    expires_at: Instant,
}

/// A response cache driven by `Cache-Control: max-age`.
///
/// Entries are keyed by the request URL and live for the `max-age` the
/// response declared, measured on the monotonic clock from the moment
/// of insertion. There is no background sweep: expired entries are
/// evicted the next time they are looked up.
///
/// The cache stores responses exactly as they came from the origin,
/// uncompressed, so a hit can be re-encoded per client.
#[derive(Default)]
pub struct Cache {
    saved: HashMap<String, Entry>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `url`, returning a clone of the stored response on a
    /// fresh hit. An expired entry is evicted and reported as a miss.
    pub fn serve_cached(&mut self, url: &str) -> Option<Response> {
        self.lookup_at(url, Instant::now())
    }

    /// Store `response` for `request`'s URL if its `Cache-Control`
    /// grants it a positive lifetime. An existing entry for the same
    /// URL is overwritten, fresh or not.
    pub fn cache_response(&mut self, request: &Request, response: &Response) {
        self.store_at(request, response, Instant::now())
    }

    fn lookup_at(&mut self, url: &str, now: Instant) -> Option<Response> {
        match self.saved.get(url) {
            None => None,
            Some(entry) if entry.expires_at < now => {
                self.saved.remove(url);
                None
            }
            Some(entry) => Some(entry.response.clone()),
        }
    }

    fn store_at(&mut self, request: &Request, response: &Response, now: Instant) {
        let duration = cache_duration(response);
        if duration > 0 {
            self.saved.insert(
                request.line.target.clone(),
                Entry {
                    response: response.clone(),
                    expires_at: now + Duration::from_secs(duration.into()),
                },
            );
        }
    }
}

/// How long a response may be cached, in seconds.
///
/// Zero means "don't": any `private` or `no-store` directive wins
/// immediately, otherwise the last `max-age=N` counts (a value that
/// does not fit a u32 reads as 0), and a response with no
/// `Cache-Control` header at all is never cached.
fn cache_duration(response: &Response) -> u32 {
    let header = match response.headers.get("Cache-Control") {
        Some(h) => h,
        None => return 0,
    };

    let mut ret = 0;
    for directive in split_value(header) {
        if directive == "private" || directive == "no-store" {
            return 0;
        }
        if let Some(age) = directive.strip_prefix("max-age=") {
            ret = age.parse().unwrap_or(0);
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use netkit_httpproto::{Headers, RequestLine, StatusLine};

    fn request(url: &str) -> Request {
        Request {
            line: RequestLine {
                method: "GET".into(),
                target: url.into(),
                version: "HTTP/1.1".into(),
            },
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    fn response(cache_control: Option<&str>) -> Response {
        let mut headers = Headers::new();
        if let Some(v) = cache_control {
            headers.append("Cache-Control", v);
        }
        Response {
            line: StatusLine {
                version: "HTTP/1.1".into(),
                code: "200".into(),
                reason: "OK".into(),
            },
            headers,
            body: b"payload".to_vec(),
        }
    }

    #[test]
    fn fresh_hit_returns_equal_response() {
        let mut cache = Cache::new();
        let req = request("http://a/");
        let resp = response(Some("max-age=30"));
        let now = Instant::now();

        cache.store_at(&req, &resp, now);
        let hit = cache.lookup_at("http://a/", now + Duration::from_secs(29));
        assert_eq!(hit, Some(resp));
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let mut cache = Cache::new();
        let req = request("http://a/");
        let now = Instant::now();

        cache.store_at(&req, &response(Some("max-age=30")), now);
        assert_eq!(cache.lookup_at("http://a/", now + Duration::from_secs(31)), None);
        // The expired lookup removed the entry entirely: even a query
        // "back in time" misses now.
        assert_eq!(cache.lookup_at("http://a/", now), None);
    }

    #[test]
    fn private_and_no_store_are_never_cached() {
        let mut cache = Cache::new();
        let req = request("http://a/");
        let now = Instant::now();

        cache.store_at(&req, &response(Some("private, max-age=600")), now);
        cache.store_at(&req, &response(Some("max-age=600, no-store")), now);
        assert_eq!(cache.lookup_at("http://a/", now), None);
    }

    #[test]
    fn no_cache_control_means_no_caching() {
        let mut cache = Cache::new();
        let now = Instant::now();
        cache.store_at(&request("http://a/"), &response(None), now);
        assert_eq!(cache.lookup_at("http://a/", now), None);
    }

    #[test]
    fn zero_and_garbage_max_age_are_not_cached() {
        let mut cache = Cache::new();
        let now = Instant::now();
        cache.store_at(&request("http://a/"), &response(Some("max-age=0")), now);
        cache.store_at(&request("http://b/"), &response(Some("max-age=soon")), now);
        assert_eq!(cache.lookup_at("http://a/", now), None);
        assert_eq!(cache.lookup_at("http://b/", now), None);
    }

    #[test]
    fn store_overwrites_existing_entry() {
        let mut cache = Cache::new();
        let req = request("http://a/");
        let now = Instant::now();

        cache.store_at(&req, &response(Some("max-age=5")), now);
        let mut newer = response(Some("max-age=60"));
        newer.body = b"newer".to_vec();
        cache.store_at(&req, &newer, now + Duration::from_secs(3));

        let hit = cache.lookup_at("http://a/", now + Duration::from_secs(30));
        assert_eq!(hit.map(|r| r.body), Some(b"newer".to_vec()));
    }

    #[test]
    fn last_max_age_directive_wins() {
        let resp = response(Some("max-age=10, max-age=70"));
        assert_eq!(cache_duration(&resp), 70);
    }
}
