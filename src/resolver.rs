// ==============================================================================
// resolver.rs - Gene Coordinate Resolver
// ==============================================================================
// Description: Resolves gene symbols to genomic intervals via MyGene.info
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Lookup request (one round trip per batch):
//   POST https://mygene.info/v3/query
//   q=RET,MEN1&scopes=symbol&fields=genomic_pos,symbol&species=human
//
// Response (JSON array, one or more items per query):
//   [{"query": "RET", "symbol": "RET",
//     "genomic_pos": {"chr": "10", "start": 43077069, "end": 43130351}},
//    {"query": "MEN1", "genomic_pos": [{...}, {...}]},
//    {"query": "XYZ", "notfound": true}]
//
// Coordinates returned by the service are 1-based inclusive.
// ==============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PanelConfig;
use crate::models::{
    is_primary_chromosome, CoordinateConvention, GeneSymbol, GenomicInterval, ReferenceBuild,
    RegionSet,
};

/// Fatal resolution errors. Per-gene failures are reported in `ResolutionReport`.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No gene symbols supplied")]
    NoGenes,

    #[error("Coordinate lookup transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Coordinate lookup returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed coordinate lookup response: {0}")]
    MalformedResponse(String),
}

/// One candidate position record from the lookup service (1-based inclusive)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub chr: Option<String>,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl PositionRecord {
    /// Lenient extraction: wrongly typed fields become None
    fn from_value(value: &Value) -> Self {
        let chr = value.get("chr").and_then(|c| {
            c.as_str()
                .map(str::to_string)
                .or_else(|| c.as_u64().map(|n| n.to_string()))
        });

        Self {
            chr,
            start: value.get("start").and_then(Value::as_u64),
            end: value.get("end").and_then(Value::as_u64),
        }
    }

    /// Chromosome, start and end when all three are present
    pub fn complete(&self) -> Option<(&str, u64, u64)> {
        match (self.chr.as_deref(), self.start, self.end) {
            (Some(chr), Some(start), Some(end)) if !chr.trim().is_empty() => Some((chr, start, end)),
            _ => None,
        }
    }

    fn span(&self) -> Option<u64> {
        self.complete().map(|(_, start, end)| end.saturating_sub(start))
    }
}

/// Lookup result for one queried symbol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupHit {
    /// Symbol exactly as it was queried
    pub query: String,
    /// Official symbol reported by the service
    pub symbol: Option<String>,
    /// Candidate loci in service order
    pub candidates: Vec<PositionRecord>,
    pub not_found: bool,
}

/// Batched coordinate lookup. Implementations make a single round trip.
#[async_trait]
pub trait CoordinateLookup: Send + Sync {
    async fn lookup(
        &self,
        symbols: &[GeneSymbol],
        build: ReferenceBuild,
    ) -> Result<Vec<LookupHit>, ResolveError>;
}

/// MyGene.info query client
pub struct MyGeneClient {
    http: reqwest::Client,
    endpoint: String,
    species: String,
}

impl MyGeneClient {
    pub fn new(config: &PanelConfig) -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.lookup.timeout_secs))
            .build()?;

        Ok(Self::with_client(http, config))
    }

    /// Use a preconfigured HTTP client (proxy, TLS or timeout settings)
    pub fn with_client(http: reqwest::Client, config: &PanelConfig) -> Self {
        Self {
            http,
            endpoint: config.lookup.endpoint.clone(),
            species: config.lookup.species.clone(),
        }
    }
}

#[async_trait]
impl CoordinateLookup for MyGeneClient {
    async fn lookup(
        &self,
        symbols: &[GeneSymbol],
        build: ReferenceBuild,
    ) -> Result<Vec<LookupHit>, ResolveError> {
        let query = symbols
            .iter()
            .map(GeneSymbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let fields = format!("{},symbol", build.position_field());
        let params = [
            ("q", query.as_str()),
            ("scopes", "symbol"),
            ("fields", fields.as_str()),
            ("species", self.species.as_str()),
        ];

        info!(
            "Fetching {} coordinates for {} genes from {}",
            build,
            symbols.len(),
            self.endpoint
        );

        let response = self.http.post(&self.endpoint).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::HttpStatus(status.as_u16()));
        }

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ResolveError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        parse_hits(&body, build)
    }
}

/// Decode a MyGene.info batch response
pub fn parse_hits(body: &Value, build: ReferenceBuild) -> Result<Vec<LookupHit>, ResolveError> {
    let items = body
        .as_array()
        .ok_or_else(|| ResolveError::MalformedResponse("expected a JSON array".to_string()))?;

    items
        .iter()
        .map(|item| {
            let query = item
                .get("query")
                .and_then(Value::as_str)
                .ok_or_else(|| ResolveError::MalformedResponse(format!("item without query: {}", item)))?
                .to_string();

            let candidates = match item.get(build.position_field()) {
                Some(Value::Array(list)) => list.iter().map(PositionRecord::from_value).collect(),
                Some(value @ Value::Object(_)) => vec![PositionRecord::from_value(value)],
                _ => Vec::new(),
            };

            Ok(LookupHit {
                query,
                symbol: item.get("symbol").and_then(Value::as_str).map(str::to_string),
                candidates,
                not_found: item.get("notfound").and_then(Value::as_bool).unwrap_or(false),
            })
        })
        .collect()
}

/// How to pick one locus when a gene has several candidate records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePolicy {
    /// First record in lookup-service order
    #[default]
    First,
    /// Widest complete record; earliest wins ties
    LargestSpan,
    /// First record on chr1-22/X/Y/M, otherwise the first record
    PrimaryAssembly,
}

impl CandidatePolicy {
    pub fn select<'a>(&self, candidates: &'a [PositionRecord]) -> Option<&'a PositionRecord> {
        match self {
            CandidatePolicy::First => candidates.first(),
            CandidatePolicy::LargestSpan => {
                let mut best: Option<(&PositionRecord, u64)> = None;
                for candidate in candidates {
                    if let Some(span) = candidate.span() {
                        if best.map_or(true, |(_, best_span)| span > best_span) {
                            best = Some((candidate, span));
                        }
                    }
                }
                best.map(|(candidate, _)| candidate).or_else(|| candidates.first())
            }
            CandidatePolicy::PrimaryAssembly => candidates
                .iter()
                .find(|c| c.chr.as_deref().is_some_and(is_primary_chromosome))
                .or_else(|| candidates.first()),
        }
    }
}

/// Why a gene was left out of the region set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NotFound,
    NoCoordinates,
    IncompleteRecord,
    InvalidInterval(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NotFound => f.write_str("not found by lookup service"),
            UnresolvedReason::NoCoordinates => f.write_str("no genomic position on this build"),
            UnresolvedReason::IncompleteRecord => f.write_str("selected record lacks chromosome/start/end"),
            UnresolvedReason::InvalidInterval(msg) => write!(f, "invalid interval: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedGene {
    pub symbol: GeneSymbol,
    pub reason: UnresolvedReason,
}

/// Outcome of one resolution batch
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    pub regions: RegionSet,
    pub unresolved: Vec<UnresolvedGene>,
}

/// Resolves a gene list into a region set on one reference build
pub struct GeneCoordinateResolver<L> {
    lookup: L,
    build: ReferenceBuild,
    convention: CoordinateConvention,
    policy: CandidatePolicy,
}

impl<L: CoordinateLookup> GeneCoordinateResolver<L> {
    pub fn new(lookup: L, config: &PanelConfig) -> Self {
        Self {
            lookup,
            build: config.reference_build,
            convention: config.coordinate_convention,
            policy: config.candidate_policy,
        }
    }

    /// Resolve every symbol independently.
    ///
    /// Genes without usable coordinates go to `unresolved`; only a failed lookup
    /// call is an error.
    pub async fn resolve(&self, genes: &[GeneSymbol]) -> Result<ResolutionReport, ResolveError> {
        if genes.is_empty() {
            return Err(ResolveError::NoGenes);
        }

        info!(
            "Resolving {} genes on {} (candidate policy: {:?}, {})",
            genes.len(),
            self.build,
            self.policy,
            self.convention
        );

        let hits = self.lookup.lookup(genes, self.build).await?;

        // Several hits for one query: the first with position records wins,
        // otherwise the first in service order
        let mut by_query: HashMap<&str, &LookupHit> = HashMap::new();
        for hit in &hits {
            let kept = by_query.get(hit.query.as_str()).copied();
            match kept {
                Some(kept) if !kept.candidates.is_empty() || hit.candidates.is_empty() => {
                    debug!("Ignoring additional hit for '{}'", hit.query);
                }
                _ => {
                    by_query.insert(hit.query.as_str(), hit);
                }
            }
        }

        let mut report = ResolutionReport::default();

        for gene in genes {
            let hit = by_query.get(gene.as_str()).copied().or_else(|| {
                let matching: Vec<&LookupHit> = hits
                    .iter()
                    .filter(|h| h.query.eq_ignore_ascii_case(gene.as_str()))
                    .collect();
                matching
                    .iter()
                    .find(|h| !h.candidates.is_empty())
                    .or(matching.first())
                    .copied()
            });

            match self.resolve_one(gene, hit) {
                Ok(interval) => {
                    info!(
                        "{:<10} {:<6} {:<12} {:<12}",
                        interval.label(),
                        interval.chromosome(),
                        interval.start(),
                        interval.end()
                    );
                    report.regions.push(interval);
                }
                Err(reason) => {
                    warn!("Could not resolve coordinates for {}: {}", gene, reason);
                    if !report.unresolved.iter().any(|u| &u.symbol == gene) {
                        report.unresolved.push(UnresolvedGene {
                            symbol: gene.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        info!(
            "Resolved {} regions ({} genes unresolved)",
            report.regions.len(),
            report.unresolved.len()
        );

        Ok(report)
    }

    fn resolve_one(
        &self,
        gene: &GeneSymbol,
        hit: Option<&LookupHit>,
    ) -> Result<GenomicInterval, UnresolvedReason> {
        let hit = hit.ok_or(UnresolvedReason::NotFound)?;
        if hit.not_found {
            return Err(UnresolvedReason::NotFound);
        }

        let candidate = self
            .policy
            .select(&hit.candidates)
            .ok_or(UnresolvedReason::NoCoordinates)?;

        if hit.candidates.len() > 1 {
            info!(
                "{}: {} candidate loci, selected {:?} by {:?} policy",
                gene,
                hit.candidates.len(),
                candidate,
                self.policy
            );
        }

        let (chr, start, end) = candidate.complete().ok_or(UnresolvedReason::IncompleteRecord)?;
        let label = hit
            .symbol
            .as_deref()
            .and_then(GeneSymbol::parse)
            .unwrap_or_else(|| gene.clone());
        let (start, end) = self.convention.from_one_based(start, end);

        GenomicInterval::new(chr, start, end, label, self.convention)
            .map_err(|e| UnresolvedReason::InvalidInterval(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct StaticLookup {
        body: Value,
        calls: AtomicUsize,
    }

    impl StaticLookup {
        fn new(body: Value) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CoordinateLookup for StaticLookup {
        async fn lookup(
            &self,
            _symbols: &[GeneSymbol],
            build: ReferenceBuild,
        ) -> Result<Vec<LookupHit>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            parse_hits(&self.body, build)
        }
    }

    fn genes(names: &[&str]) -> Vec<GeneSymbol> {
        names.iter().filter_map(|n| GeneSymbol::parse(n)).collect()
    }

    fn resolver(body: Value, policy: CandidatePolicy) -> GeneCoordinateResolver<StaticLookup> {
        let config = PanelConfig {
            candidate_policy: policy,
            ..PanelConfig::default()
        };
        GeneCoordinateResolver::new(StaticLookup::new(body), &config)
    }

    fn panel_response() -> Value {
        json!([
            {"query": "RET", "symbol": "RET",
             "genomic_pos": {"chr": "10", "start": 43077069, "end": 43130351}},
            {"query": "PTH", "symbol": "PTH",
             "genomic_pos": [
                {"chr": "HSCHR11_1_CTG1", "start": 100, "end": 50000},
                {"chr": "11", "start": 13491938, "end": 13494412}
             ]},
            {"query": "FAKE1", "notfound": true},
            {"query": "GCM2", "symbol": "GCM2", "genomic_pos": {"start": 10, "end": 20}}
        ])
    }

    #[tokio::test]
    async fn test_resolve_mixed_batch() {
        let resolver = resolver(panel_response(), CandidatePolicy::First);
        let report = resolver
            .resolve(&genes(&["RET", "PTH", "FAKE1", "GCM2"]))
            .await
            .unwrap();

        assert_eq!(report.regions.len(), 2);
        let intervals: Vec<_> = report.regions.iter().collect();
        assert_eq!(intervals[0].chromosome(), "chr10");
        // 1-based 43077069 becomes BED start 43077068
        assert_eq!(intervals[0].start(), 43_077_068);
        assert_eq!(intervals[0].end(), 43_130_351);
        assert_eq!(intervals[0].label().as_str(), "RET");

        // First policy takes the alt contig listed first
        assert_eq!(intervals[1].chromosome(), "chrHSCHR11_1_CTG1");

        assert_eq!(report.unresolved.len(), 2);
        assert_eq!(report.unresolved[0].symbol.as_str(), "FAKE1");
        assert_eq!(report.unresolved[0].reason, UnresolvedReason::NotFound);
        assert_eq!(report.unresolved[1].symbol.as_str(), "GCM2");
        assert_eq!(report.unresolved[1].reason, UnresolvedReason::IncompleteRecord);

        for interval in report.regions.iter() {
            assert!(interval.start() <= interval.end());
            assert!(!interval.chromosome().is_empty());
        }
    }

    #[tokio::test]
    async fn test_single_round_trip() {
        let resolver = resolver(panel_response(), CandidatePolicy::First);
        resolver.resolve(&genes(&["RET", "PTH", "GCM2"])).await.unwrap();
        assert_eq!(resolver.lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_assembly_policy() {
        let resolver = resolver(panel_response(), CandidatePolicy::PrimaryAssembly);
        let report = resolver.resolve(&genes(&["PTH"])).await.unwrap();
        let interval = report.regions.iter().next().unwrap();
        assert_eq!(interval.chromosome(), "chr11");
        assert_eq!(interval.start(), 13_491_937);
    }

    #[test]
    fn test_largest_span_policy() {
        let record = |chr: Option<&str>, start: u64, end: u64| PositionRecord {
            chr: chr.map(str::to_string),
            start: Some(start),
            end: Some(end),
        };
        let candidates = vec![
            record(Some("1"), 100, 200),
            record(None, 0, 1_000_000),
            record(Some("2"), 100, 900),
            record(Some("3"), 0, 800),
        ];
        let selected = CandidatePolicy::LargestSpan.select(&candidates).unwrap();
        // Incomplete record is ignored; chr3 ties with chr2 and chr2 came first
        assert_eq!(selected.chr.as_deref(), Some("2"));

        assert!(CandidatePolicy::LargestSpan.select(&[]).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_gene_is_deterministic() {
        let body = json!([
            {"query": "CASR", "symbol": "CASR",
             "genomic_pos": {"chr": "3", "start": 122183668, "end": 122291629}},
            {"query": "CASR", "symbol": "CASR",
             "genomic_pos": {"chr": "3", "start": 122183668, "end": 122291629}}
        ]);
        let resolver = resolver(body, CandidatePolicy::First);

        let first = resolver.resolve(&genes(&["CASR", "CASR"])).await.unwrap();
        let second = resolver.resolve(&genes(&["CASR", "CASR"])).await.unwrap();

        assert_eq!(first.regions.len(), 1);
        assert_eq!(first.regions, second.regions);
    }

    #[tokio::test]
    async fn test_later_hit_with_coordinates_is_used() {
        let body = json!([
            {"query": "TG", "symbol": "TG-AS1"},
            {"query": "TG", "symbol": "TG",
             "genomic_pos": {"chr": "8", "start": 132866958, "end": 133134903}},
            {"query": "TG", "symbol": "TG-DUP",
             "genomic_pos": {"chr": "8", "start": 1, "end": 2}}
        ]);
        let resolver = resolver(body, CandidatePolicy::First);
        let report = resolver.resolve(&genes(&["TG"])).await.unwrap();

        assert!(report.unresolved.is_empty());
        assert_eq!(report.regions.len(), 1);
        let interval = report.regions.iter().next().unwrap();
        assert_eq!(interval.label().as_str(), "TG");
        assert_eq!(interval.chromosome(), "chr8");
        assert_eq!(interval.start(), 132_866_957);
    }

    #[tokio::test]
    async fn test_later_hit_used_for_case_insensitive_match() {
        let body = json!([
            {"query": "tg"},
            {"query": "tg", "symbol": "TG",
             "genomic_pos": {"chr": "8", "start": 132866958, "end": 133134903}}
        ]);
        let resolver = resolver(body, CandidatePolicy::First);
        let report = resolver.resolve(&genes(&["TG"])).await.unwrap();
        assert_eq!(report.regions.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_hit_is_unresolved() {
        let resolver = resolver(json!([]), CandidatePolicy::First);
        let report = resolver.resolve(&genes(&["TSHR"])).await.unwrap();
        assert!(report.regions.is_empty());
        assert_eq!(report.unresolved.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_gene_list_rejected() {
        let resolver = resolver(json!([]), CandidatePolicy::First);
        assert!(matches!(resolver.resolve(&[]).await, Err(ResolveError::NoGenes)));
    }

    #[tokio::test]
    async fn test_malformed_response_is_fatal() {
        let resolver = resolver(json!({"error": "bad request"}), CandidatePolicy::First);
        let result = resolver.resolve(&genes(&["RET"])).await;
        assert!(matches!(result, Err(ResolveError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_hits_hg19_field() {
        let body = json!([
            {"query": "TG", "genomic_pos": {"chr": "8", "start": 1, "end": 2},
             "genomic_pos_hg19": {"chr": "8", "start": 133879205, "end": 134147143}}
        ]);
        let hits = parse_hits(&body, ReferenceBuild::Hg19).unwrap();
        assert_eq!(hits[0].candidates[0].start, Some(133_879_205));
    }

    #[test]
    fn test_parse_hits_lenient_fields() {
        let body = json!([{"query": "TPO", "genomic_pos": {"chr": 2, "start": "oops", "end": 5}}]);
        let hits = parse_hits(&body, ReferenceBuild::Hg38).unwrap();
        let record = &hits[0].candidates[0];
        assert_eq!(record.chr.as_deref(), Some("2"));
        assert_eq!(record.start, None);
        assert!(record.complete().is_none());
    }

    /// Accept one connection, answer it, and hand back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}/v3/query", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= split + 4 + length
    }

    fn client_for(endpoint: String) -> MyGeneClient {
        let mut config = PanelConfig::default();
        config.lookup.endpoint = endpoint;
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        MyGeneClient::with_client(http, &config)
    }

    #[tokio::test]
    async fn test_client_sends_form_query() {
        let body = r#"[{"query": "RET", "symbol": "RET", "genomic_pos_hg19": {"chr": "10", "start": 43572517, "end": 43625799}}]"#;
        let (endpoint, server) = serve_once("200 OK", body).await;

        let hits = client_for(endpoint)
            .lookup(&genes(&["RET", "MEN1"]), ReferenceBuild::Hg19)
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /v3/query"));
        assert!(request.contains("application/x-www-form-urlencoded"));
        assert!(request.contains("q=RET%2CMEN1"));
        assert!(request.contains("scopes=symbol"));
        assert!(request.contains("fields=genomic_pos_hg19%2Csymbol"));
        assert!(request.contains("species=human"));

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].candidates[0].start, Some(43_572_517));
    }

    #[tokio::test]
    async fn test_client_http_error_status() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "{}").await;

        let result = client_for(endpoint)
            .lookup(&genes(&["RET"]), ReferenceBuild::Hg38)
            .await;
        let request = server.await.unwrap();

        assert!(request.contains("fields=genomic_pos%2Csymbol"));
        assert!(matches!(result, Err(ResolveError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_client_invalid_json_is_malformed() {
        let (endpoint, server) = serve_once("200 OK", "not json").await;

        let result = client_for(endpoint)
            .lookup(&genes(&["RET"]), ReferenceBuild::Hg38)
            .await;
        server.await.unwrap();

        assert!(matches!(result, Err(ResolveError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_client_transport_failure_is_fatal() {
        // Bind then drop to get a local port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let resolver = GeneCoordinateResolver::new(
            client_for(format!("http://{}/v3/query", addr)),
            &PanelConfig::default(),
        );
        let result = resolver.resolve(&genes(&["RET"])).await;
        assert!(matches!(result, Err(ResolveError::Transport(_))));
    }
}
