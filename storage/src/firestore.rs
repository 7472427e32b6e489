use crate as storage;
use crate::{Connector, Document, DocumentStore, Filter, FindOptions, Projection};
use async_trait::async_trait;
use chrono::Utc;
use hyper::{
    body::{self, Body},
    client::{Client, HttpConnector},
    header::HeaderName,
    Method, Request, StatusCode,
};
use hyper_tls::HttpsConnector;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::{
    collections::HashMap,
    convert::TryFrom,
    path::PathBuf,
    sync::Arc,
    time,
};
use tokio::{
    fs,
    sync::oneshot::{self, error::TryRecvError},
    sync::RwLock,
    task,
};

/// Cloud Firestore over its REST API.
///
/// Firestore has no random-sampling primitive, so [`DocumentStore::sample`]
/// always reports `Unsupported` and callers fall back to count-and-skip.
pub struct Firestore {
    client: Arc<Client<HttpsConnector<HttpConnector>>>,
    database: String,
    _oauth_token: Arc<RwLock<String>>,
    _oauth_refresh_handle: task::JoinHandle<()>,
    _oauth_refresh_cancellation: oneshot::Sender<()>,
}

impl Firestore {
    pub async fn new<P: Into<PathBuf>>(json_key_path: P) -> storage::Result<Firestore> {
        // Create shared HTTP client
        let mut https = HttpsConnector::new();
        https.https_only(true);
        let client = Arc::new(Client::builder().build::<_, hyper::Body>(https));

        // Get OAuth token
        let json_key = read_json_key(json_key_path).await?;
        let jwt = build_jwt(&json_key.client_email, &json_key.private_key)?;
        let (oauth_token, oauth_expires_in) = get_oauth_token(jwt, &client).await?;
        let oauth_token = Arc::new(RwLock::new(oauth_token));
        let mut oauth_expires_in: u64 = oauth_expires_in as u64;

        // Start background task to refresh OAuth token
        let (oauth_tx, mut oauth_rx) = oneshot::channel();
        let client_clone = Arc::clone(&client);
        let client_email = json_key.client_email.clone();
        let private_key = json_key.private_key.clone();
        let oauth_token_clone = Arc::clone(&oauth_token);
        let oauth_handle = tokio::spawn(async move {
            while let Err(TryRecvError::Empty) = oauth_rx.try_recv() {
                // Refresh token 10 minutes before expiration
                let delay = time::Duration::from_secs(oauth_expires_in.saturating_sub(600));
                tokio::time::sleep(delay).await;
                if let Err(TryRecvError::Closed) = oauth_rx.try_recv() {
                    debug!("Stopping background task to refresh OAuth token");
                    break;
                }

                info!("Renewing OAuth token");
                let renewed = match build_jwt(&client_email, &private_key) {
                    Ok(jwt) => get_oauth_token(jwt, &client_clone).await,
                    Err(e) => Err(e),
                };
                match renewed {
                    Ok((token, expires_in)) => {
                        *oauth_token_clone.write().await = token;
                        oauth_expires_in = expires_in as u64;
                        debug!("Successfully renewed OAuth token");
                    }
                    Err(e) => {
                        error!(
                            "Failed to renew OAuth token, will retry renewal flow in 10s. Error: {}",
                            e
                        );
                        oauth_expires_in = 610;
                    }
                }
            }
        });

        Ok(Firestore {
            client,
            database: format!(
                "projects/{}/databases/(default)/documents",
                json_key.project_id
            ),
            _oauth_token: oauth_token,
            _oauth_refresh_handle: oauth_handle,
            _oauth_refresh_cancellation: oauth_tx,
        })
    }

    async fn post<T: Serialize>(&self, uri: &str, payload: &T) -> storage::Result<Vec<u8>> {
        let req = build_firestore_request(
            Method::POST,
            uri,
            &*self._oauth_token.read().await,
            Some(payload),
        )?;
        debug!("POST {} {:?}", uri, req);
        let resp = self.client.request(req).await?;
        let status = resp.status();
        let body_bytes = body::to_bytes(resp.into_body()).await.unwrap_or_default();
        debug!(
            "HTTP {} {}",
            status,
            String::from_utf8(body_bytes.to_vec()).unwrap_or_else(|_| "<mangled body>".to_owned()),
        );
        match status {
            StatusCode::OK => Ok(body_bytes.to_vec()),
            StatusCode::SERVICE_UNAVAILABLE => Err(storage::Error::Unavailable(format!(
                "HTTP {} from {}",
                status, uri
            ))),
            _ => {
                error!("Non-success status code {} from {}", status, uri);
                Err(storage::Error::Other(format!(
                    "Non-success status code {} from {}",
                    status, uri
                )))
            }
        }
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    async fn ping(&self) -> storage::Result<()> {
        let uri = format!(
            "https://firestore.googleapis.com/v1/{}:listCollectionIds",
            self.database
        );
        self.post(&uri, &ListCollectionIdsRequest { page_size: 1 })
            .await
            .map(|_| ())
    }

    async fn sample(
        &self,
        collection: &str,
        _size: usize,
        _projection: Option<&Projection>,
    ) -> storage::Result<Vec<Document>> {
        Err(storage::Error::Unsupported(format!(
            "Firestore cannot sample collection '{}'",
            collection
        )))
    }

    async fn estimated_count(&self, collection: &str) -> storage::Result<u64> {
        let uri = format!(
            "https://firestore.googleapis.com/v1/{}:runAggregationQuery",
            self.database
        );
        let body = RunAggregationQueryRequest {
            structured_aggregation_query: StructuredAggregationQuery {
                structured_query: StructuredQuery::count_of(collection),
                aggregations: vec![Aggregation {
                    alias: COUNT_ALIAS.to_owned(),
                    count: CountAggregation {},
                }],
            },
        };
        let bytes = self.post(&uri, &body).await?;
        let results: Vec<RunAggregationQueryResponse> = serde_json::from_slice(&bytes)?;
        parse_count(results)
    }

    async fn find(
        &self,
        collection: &str,
        options: &FindOptions,
    ) -> storage::Result<Vec<Document>> {
        let uri = format!(
            "https://firestore.googleapis.com/v1/{}:runQuery",
            self.database
        );
        let body = RunQueryRequest {
            structured_query: StructuredQuery::find(collection, options)?,
        };
        let bytes = self.post(&uri, &body).await?;
        let results: Vec<RunQueryResponse> = serde_json::from_slice(&bytes)?;
        Ok(results
            .into_iter()
            .filter_map(|r| r.document)
            .map(Document::from)
            .collect())
    }
}

/// Connects to Firestore with a service account key file.
pub struct FirestoreConnector {
    json_key_path: PathBuf,
}

impl FirestoreConnector {
    pub fn new<P: Into<PathBuf>>(json_key_path: P) -> FirestoreConnector {
        FirestoreConnector {
            json_key_path: json_key_path.into(),
        }
    }
}

#[async_trait]
impl Connector for FirestoreConnector {
    async fn connect(&self) -> storage::Result<Arc<dyn DocumentStore>> {
        let firestore = Firestore::new(self.json_key_path.clone()).await?;
        Ok(Arc::new(firestore))
    }
}

const COUNT_ALIAS: &str = "count";

fn parse_count(results: Vec<RunAggregationQueryResponse>) -> storage::Result<u64> {
    let field = results
        .into_iter()
        .filter_map(|r| r.result)
        .find_map(|mut r| r.aggregate_fields.remove(COUNT_ALIAS));
    match field {
        Some(FirestoreValue::IntegerValue(n)) => n
            .parse()
            .map_err(|_| storage::Error::Other(format!("Invalid count value '{}'", n))),
        Some(other) => Err(storage::Error::Other(format!(
            "Unexpected count value {:?}",
            other
        ))),
        None => Err(storage::Error::Other(
            "Aggregation response did not contain a count".to_owned(),
        )),
    }
}

// ###############
// # Wire format #
// ###############

#[derive(Clone, Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

impl From<FirestoreDocument> for Document {
    fn from(value: FirestoreDocument) -> Self {
        let fields: Map<String, Value> = value
            .fields
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        Document::new(fields)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
enum FirestoreValue {
    NullValue(Option<()>),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FirestoreValue>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
struct MapValue {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

impl From<FirestoreValue> for Value {
    fn from(value: FirestoreValue) -> Self {
        match value {
            FirestoreValue::NullValue(_) => Value::Null,
            FirestoreValue::BooleanValue(b) => Value::Bool(b),
            // Firestore sends int64 as a decimal string
            FirestoreValue::IntegerValue(s) => match s.parse::<i64>() {
                Ok(n) => Value::Number(n.into()),
                Err(_) => Value::String(s),
            },
            FirestoreValue::DoubleValue(d) => match Number::from_f64(d) {
                Some(n) => Value::Number(n),
                None => Value::Null,
            },
            FirestoreValue::TimestampValue(s)
            | FirestoreValue::StringValue(s)
            | FirestoreValue::BytesValue(s)
            | FirestoreValue::ReferenceValue(s) => Value::String(s),
            FirestoreValue::GeoPointValue(v) => v,
            FirestoreValue::ArrayValue(a) => {
                Value::Array(a.values.into_iter().map(Value::from).collect())
            }
            FirestoreValue::MapValue(m) => Value::Object(
                m.fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for FirestoreValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FirestoreValue::NullValue(None),
            Value::Bool(b) => FirestoreValue::BooleanValue(*b),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    FirestoreValue::IntegerValue(n.to_string())
                } else {
                    FirestoreValue::DoubleValue(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => FirestoreValue::StringValue(s.clone()),
            Value::Array(a) => FirestoreValue::ArrayValue(ArrayValue {
                values: a.iter().map(FirestoreValue::from).collect(),
            }),
            Value::Object(o) => FirestoreValue::MapValue(MapValue {
                fields: o
                    .iter()
                    .map(|(k, v)| (k.clone(), FirestoreValue::from(v)))
                    .collect(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsRequest {
    page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest {
    structured_query: StructuredQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryResponse {
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunAggregationQueryRequest {
    structured_aggregation_query: StructuredAggregationQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredAggregationQuery {
    structured_query: StructuredQuery,
    aggregations: Vec<Aggregation>,
}

#[derive(Debug, Serialize)]
struct Aggregation {
    alias: String,
    count: CountAggregation,
}

#[derive(Debug, Serialize)]
struct CountAggregation {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunAggregationQueryResponse {
    result: Option<AggregationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregationResult {
    #[serde(default)]
    aggregate_fields: HashMap<String, FirestoreValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    select: Option<SelectFields>,
    from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_filter: Option<QueryFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl StructuredQuery {
    fn count_of(collection: &str) -> StructuredQuery {
        StructuredQuery {
            select: None,
            from: vec![CollectionSelector::new(collection)],
            where_filter: None,
            offset: None,
            limit: None,
        }
    }

    fn find(collection: &str, options: &FindOptions) -> storage::Result<StructuredQuery> {
        // runQuery takes int32 offsets and limits
        let offset = match options.skip {
            0 => None,
            n => Some(
                u32::try_from(n)
                    .map_err(|_| storage::Error::Other(format!("Offset {} out of range", n)))?,
            ),
        };
        let limit = match options.limit {
            Some(n) => Some(
                u32::try_from(n)
                    .map_err(|_| storage::Error::Other(format!("Limit {} out of range", n)))?,
            ),
            None => None,
        };

        Ok(StructuredQuery {
            select: options.projection.as_ref().map(SelectFields::from),
            from: vec![CollectionSelector::new(collection)],
            where_filter: QueryFilter::from_filter(&options.filter),
            offset,
            limit,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: String,
}

impl CollectionSelector {
    fn new(collection: &str) -> CollectionSelector {
        CollectionSelector {
            collection_id: collection.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SelectFields {
    fields: Vec<FieldReference>,
}

impl From<&Projection> for SelectFields {
    fn from(projection: &Projection) -> Self {
        SelectFields {
            fields: projection
                .fields
                .iter()
                .map(|f| FieldReference {
                    field_path: f.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum QueryFilter {
    FieldFilter(FieldFilter),
    CompositeFilter(CompositeFilter),
}

impl QueryFilter {
    fn from_filter(filter: &Filter) -> Option<QueryFilter> {
        let mut field_filters: Vec<QueryFilter> = filter
            .equals
            .iter()
            .map(|(field, value)| {
                QueryFilter::FieldFilter(FieldFilter {
                    field: FieldReference {
                        field_path: field.clone(),
                    },
                    op: "EQUAL".to_owned(),
                    value: FirestoreValue::from(value),
                })
            })
            .collect();
        match field_filters.len() {
            0 => None,
            1 => field_filters.pop(),
            _ => Some(QueryFilter::CompositeFilter(CompositeFilter {
                op: "AND".to_owned(),
                filters: field_filters,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldFilter {
    field: FieldReference,
    op: String,
    value: FirestoreValue,
}

#[derive(Debug, Serialize)]
struct CompositeFilter {
    op: String,
    filters: Vec<QueryFilter>,
}

// ########
// # Auth #
// ########

#[derive(Debug, Deserialize)]
struct JsonKey {
    project_id: String,
    private_key: String,
    client_email: String,
}

async fn read_json_key<P: Into<PathBuf>>(json_key_path: P) -> storage::Result<JsonKey> {
    let contents = fs::read_to_string(json_key_path.into()).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// OpenID Connect claims data structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Email address of the service account
    iss: String,
    /// Space-delimited list of the permissions requested
    scope: String,
    /// Intended target of assertion, should just be https://oauth2.googleapis.com/token
    aud: String,
    /// Expiration time of the assertion, as seconds since epoch. Maximum of 1 hour after issuance
    exp: usize,
    /// Assertion issuance time, as seconds since epoch
    iat: usize,
}

fn build_jwt(email: &str, private_key: &str) -> storage::Result<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        iss: email.to_string(),
        scope: "https://www.googleapis.com/auth/datastore".to_owned(),
        aud: "https://oauth2.googleapis.com/token".to_owned(),
        exp: now + 3600,
        iat: now,
    };

    let token = encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(private_key.as_ref())?,
    )?;
    Ok(token)
}

#[derive(Debug, Serialize)]
struct OAuth2Request {
    grant_type: String,
    assertion: String,
}

#[derive(Debug, Deserialize)]
struct OAuth2Response {
    access_token: String,
    expires_in: usize,
}

async fn get_oauth_token(
    jwt: String,
    http_client: &Client<HttpsConnector<HttpConnector>>,
) -> storage::Result<(String, usize)> {
    let sw = time::Instant::now();

    let request_body = OAuth2Request {
        grant_type: "urn:ietf:params:oauth:grant-type:jwt-bearer".to_owned(),
        assertion: jwt,
    };
    let request = Request::builder()
        .method(Method::POST)
        .uri("https://oauth2.googleapis.com/token")
        .header(HeaderName::from_static("content-type"), "application/json")
        .body(Body::from(serde_json::to_string(&request_body)?))?;
    let response = http_client.request(request).await?;
    let status = response.status();
    let body_bytes = body::to_bytes(response.into_body())
        .await
        .unwrap_or_default();

    match status {
        StatusCode::OK => {
            let body: OAuth2Response = serde_json::from_slice(&body_bytes)?;
            info!("Obtained OAuth token, took {:?}", sw.elapsed());
            Ok((body.access_token, body.expires_in))
        }
        _ => {
            let body_str = String::from_utf8(body_bytes.to_vec())
                .unwrap_or_else(|_| "<mangled body>".to_owned());
            info!("Failed to obtain OAuth token, took {:?}", sw.elapsed());
            Err(storage::Error::OAuth(format!(
                "OAuth flow returned HTTP {} with body content: {}",
                status, body_str
            )))
        }
    }
}

fn build_firestore_request<T>(
    method: Method,
    uri: &str,
    auth_token: &str,
    body: Option<&T>,
) -> storage::Result<Request<Body>>
where
    T: Sized + Serialize,
{
    let b = Request::builder()
        .method(method)
        .uri(uri)
        .header(HeaderName::from_static("accept"), "application/json")
        .header(
            HeaderName::from_static("authorization"),
            format!("Bearer {}", auth_token),
        );

    let body = match body {
        None => Body::empty(),
        Some(b) => Body::from(serde_json::to_string(b)?),
    };

    Ok(b.body(body)?)
}
