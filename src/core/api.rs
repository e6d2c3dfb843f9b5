use crate::domain::error::{CeError, CeResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// HTTP verbs used against the management API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Ordered query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key=value` filter
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Restrict the fields returned for each record
    pub fn fields(self, fields: &str) -> Self {
        self.with("fields", fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A single request against the management API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path below the cluster address, e.g. `/api/storage/volumes`
    pub path: String,
    pub query: Query,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path, Some(body))
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, path, Some(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, None)
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
}

/// Transport seam between the operations and the cluster.
///
/// Implementations return the decoded JSON body (`Value::Null` for an empty
/// body) and map non-success answers to [`CeError::Api`].
#[async_trait]
pub trait RestApi: Send + Sync {
    async fn send(&self, request: ApiRequest) -> CeResult<Value>;
}

#[derive(Debug, Deserialize)]
struct CollectionPage {
    #[serde(default)]
    records: Vec<Value>,
    #[serde(default, rename = "_links")]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<Href>,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

/// Fetch every record of a collection, following `_links.next` across pages.
pub async fn collect_records<T: DeserializeOwned>(
    api: &dyn RestApi,
    path: &str,
    query: Query,
) -> CeResult<Vec<T>> {
    let mut request = ApiRequest::get(path).with_query(query);
    let mut records = Vec::new();

    loop {
        let body = api.send(request).await?;
        if body.is_null() {
            break;
        }

        let page: CollectionPage = serde_json::from_value(body).map_err(|e| {
            CeError::InvalidResponse(format!("collection from {}: {}", path, e))
        })?;
        for record in page.records {
            let record = serde_json::from_value(record).map_err(|e| {
                CeError::InvalidResponse(format!("record from {}: {}", path, e))
            })?;
            records.push(record);
        }

        match page.links.and_then(|links| links.next) {
            Some(next) => {
                tracing::debug!("Following next page link {}", next.href);
                request = ApiRequest::get(next.href);
            }
            None => break,
        }
    }

    Ok(records)
}

/// Look up a single record: none found is `Ok(None)`, more than one is an error.
pub async fn find_one<T: DeserializeOwned>(
    api: &dyn RestApi,
    path: &str,
    query: Query,
) -> CeResult<Option<T>> {
    let mut records: Vec<T> = collect_records(api, path, query).await?;
    match records.len() {
        0 => Ok(None),
        1 => Ok(records.pop()),
        count => Err(CeError::AmbiguousRecord {
            path: path.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted answer for a route
    #[derive(Debug, Clone)]
    pub enum Reply {
        Json(Value),
        Status(u16, &'static str),
    }

    struct Route {
        method: HttpMethod,
        path: String,
        replies: VecDeque<Reply>,
    }

    /// Recording API double.
    ///
    /// Routes match on method and path. Queued replies are consumed in order
    /// and the last one repeats. Unrouted GETs answer an empty collection,
    /// everything else an empty body.
    #[derive(Default)]
    pub struct MockApi {
        routes: Mutex<Vec<Route>>,
        calls: Mutex<Vec<ApiRequest>>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(&self, method: HttpMethod, path: &str, reply: Value) -> &Self {
            self.push(method, path, Reply::Json(reply))
        }

        pub fn on_error(
            &self,
            method: HttpMethod,
            path: &str,
            status: u16,
            message: &'static str,
        ) -> &Self {
            self.push(method, path, Reply::Status(status, message))
        }

        fn push(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
            let mut routes = self.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.path == path)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    path: path.to_string(),
                    replies: VecDeque::from(vec![reply]),
                }),
            }
            self
        }

        pub fn calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls rendered as `METHOD path`
        pub fn call_lines(&self) -> Vec<String> {
            self.calls()
                .iter()
                .map(|c| format!("{} {}", c.method, c.path))
                .collect()
        }
    }

    #[async_trait]
    impl RestApi for MockApi {
        async fn send(&self, request: ApiRequest) -> CeResult<Value> {
            self.calls.lock().unwrap().push(request.clone());

            let reply = {
                let mut routes = self.routes.lock().unwrap();
                routes
                    .iter_mut()
                    .find(|r| r.method == request.method && r.path == request.path)
                    .and_then(|route| {
                        if route.replies.len() > 1 {
                            route.replies.pop_front()
                        } else {
                            route.replies.front().cloned()
                        }
                    })
            };

            match reply {
                Some(Reply::Json(value)) => Ok(value),
                Some(Reply::Status(status, message)) => Err(CeError::Api {
                    status,
                    code: None,
                    message: message.to_string(),
                }),
                None if request.method == HttpMethod::Get => {
                    Ok(json!({ "records": [], "num_records": 0 }))
                }
                None => Ok(Value::Null),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockApi;
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    #[tokio::test]
    async fn test_collect_records_follows_next_links() {
        let api = MockApi::new();
        api.on(
            HttpMethod::Get,
            "/api/storage/volumes",
            json!({
                "records": [{ "name": "vol_a" }, { "name": "vol_b" }],
                "num_records": 2,
                "_links": { "next": { "href": "/api/storage/volumes?start.uuid=abc" } }
            }),
        );
        api.on(
            HttpMethod::Get,
            "/api/storage/volumes?start.uuid=abc",
            json!({ "records": [{ "name": "vol_c" }], "num_records": 1 }),
        );

        let query = Query::new().with("svm.name", "vs1").fields("name");
        let records: Vec<Named> = collect_records(&api, "/api/storage/volumes", query)
            .await
            .unwrap();

        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["vol_a", "vol_b", "vol_c"]);

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].query.get("svm.name"), Some("vs1"));
        assert!(calls[1].query.is_empty());
    }

    #[tokio::test]
    async fn test_find_one_semantics() {
        let api = MockApi::new();
        let none: Option<Named> = find_one(&api, "/api/storage/volumes", Query::new())
            .await
            .unwrap();
        assert!(none.is_none());

        api.on(
            HttpMethod::Get,
            "/api/storage/volumes",
            json!({ "records": [{ "name": "only" }] }),
        );
        let one: Option<Named> = find_one(&api, "/api/storage/volumes", Query::new())
            .await
            .unwrap();
        assert_eq!(one.unwrap().name, "only");
    }

    #[tokio::test]
    async fn test_find_one_rejects_multiple_records() {
        let api = MockApi::new();
        api.on(
            HttpMethod::Get,
            "/api/snapmirror/relationships",
            json!({ "records": [{ "name": "a" }, { "name": "b" }] }),
        );
        let result: CeResult<Option<Named>> =
            find_one(&api, "/api/snapmirror/relationships", Query::new()).await;
        assert!(matches!(
            result,
            Err(CeError::AmbiguousRecord { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_collection_is_invalid_response() {
        let api = MockApi::new();
        api.on(
            HttpMethod::Get,
            "/api/storage/volumes",
            json!({ "records": "not-a-list" }),
        );
        let result: CeResult<Vec<Named>> =
            collect_records(&api, "/api/storage/volumes", Query::new()).await;
        assert!(matches!(result, Err(CeError::InvalidResponse(_))));
    }
}
