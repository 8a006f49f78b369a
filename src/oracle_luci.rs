//! [`CiOracle`] backed by the LUCI pRPC endpoints.
//!
//! Two calls are used:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | [`get_build`](CiOracle::get_build) | `buildbucket.v2.Builds/GetBuild` |
//! | [`get_results`](CiOracle::get_results) | `luci.resultdb.v1.ResultDB/QueryTestResults` |
//!
//! pRPC answers JSON prefixed with the `)]}'` XSSI guard, which is stripped
//! before parsing. Result pages are followed through `nextPageToken`.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::LocatorConfig;
use crate::models::{BuildRef, TestResult, TestStatus};
use crate::traits::CiOracle;

const XSSI_PREFIX: &str = ")]}'";
const RESULTS_PAGE_SIZE: u64 = 1000;

pub struct LuciOracle {
    client: reqwest::blocking::Client,
    buildbucket_host: String,
    resultdb_host: String,
}

impl LuciOracle {
    pub fn new(config: &LocatorConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            buildbucket_host: config.buildbucket_host.clone(),
            resultdb_host: config.resultdb_host.clone(),
        })
    }

    fn prpc(&self, host: &str, service: &str, method: &str, body: &Value) -> Result<Value> {
        let url = format!("https://{}/prpc/{}/{}", host, service, method);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(body)
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let text = response.text().unwrap_or_default();
        if !status.is_success() {
            bail!("{} {}: {}", method, status, text.trim());
        }
        parse_prpc_body(&text)
    }
}

/// Strip the XSSI guard and parse the JSON body.
pub fn parse_prpc_body(text: &str) -> Result<Value> {
    let body = text.trim_start();
    let body = body.strip_prefix(XSSI_PREFIX).unwrap_or(body);
    serde_json::from_str(body).with_context(|| "invalid pRPC response body")
}

/// Extract a [`BuildRef`] from a `GetBuild` response.
pub fn parse_build(json: &Value, builder: &str, number: u64) -> Result<BuildRef> {
    let build_id = match json.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => bail!("build {} #{} has no id", builder, number),
    };

    let fingerprint = json
        .pointer("/input/gitilesCommit/id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("build {} #{} has no revision", builder, number))?;

    Ok(BuildRef {
        builder: builder.to_string(),
        number,
        fingerprint: fingerprint.to_string(),
        build_id,
    })
}

/// Extract test results and the next page token from a
/// `QueryTestResults` response.
pub fn parse_results_page(json: &Value) -> Result<(Vec<TestResult>, Option<String>)> {
    let mut results = Vec::new();
    if let Some(items) = json.get("testResults") {
        let items = items
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("invalid results: testResults is not a list"))?;
        for item in items {
            let test_id = item
                .get("testId")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow::anyhow!("invalid results: missing testId"))?;
            let status = item
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("STATUS_UNSPECIFIED");
            results.push(TestResult::new(test_id, TestStatus::parse(status)));
        }
    }

    let next = json
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok((results, next))
}

impl CiOracle for LuciOracle {
    fn get_build(&self, project: &str, bucket: &str, builder: &str, number: u64) -> Result<BuildRef> {
        let body = json!({
            "builder": { "project": project, "bucket": bucket, "builder": builder },
            "buildNumber": number,
            "mask": { "fields": "id,number,input.gitilesCommit" },
        });
        let reply = self.prpc(&self.buildbucket_host, "buildbucket.v2.Builds", "GetBuild", &body)?;
        parse_build(&reply, builder, number)
    }

    fn get_results(&self, build_id: &str) -> Result<Vec<TestResult>> {
        let invocation = format!("invocations/build-{}", build_id);
        let mut results = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut body = json!({
                "invocations": [invocation],
                "pageSize": RESULTS_PAGE_SIZE,
            });
            if let Some(token) = &page_token {
                body["pageToken"] = json!(token);
            }

            let reply = self.prpc(
                &self.resultdb_host,
                "luci.resultdb.v1.ResultDB",
                "QueryTestResults",
                &body,
            )?;
            let (page, next) = parse_results_page(&reply)?;
            debug!(invocation = %invocation, page = page.len(), "fetched results page");
            results.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_xssi_prefix() {
        let v = parse_prpc_body(")]}'\n{\"id\":\"1\"}").unwrap();
        assert_eq!(v["id"], "1");
        let plain = parse_prpc_body("{\"id\":\"2\"}").unwrap();
        assert_eq!(plain["id"], "2");
    }

    #[test]
    fn build_needs_a_revision() {
        let ok = json!({
            "id": "8760000000000000001",
            "number": 1234,
            "input": { "gitilesCommit": { "id": "deadbeef" } }
        });
        let build = parse_build(&ok, "linux-autofill-captured-sites-rel", 1234).unwrap();
        assert_eq!(build.build_id, "8760000000000000001");
        assert_eq!(build.fingerprint, "deadbeef");

        let missing = json!({ "id": "1", "input": {} });
        let err = parse_build(&missing, "b", 7).unwrap_err();
        assert!(err.to_string().contains("has no revision"));
    }

    #[test]
    fn results_page_is_parsed_in_order() {
        let page = json!({
            "testResults": [
                { "testId": "ninja://t/All.a", "status": "FAIL" },
                { "testId": "ninja://t/All.b", "status": "PASS" },
                { "testId": "ninja://t/All.c", "status": "CRASH" },
                { "testId": "ninja://t/All.d", "status": "ABORT" },
            ],
            "nextPageToken": "tok"
        });
        let (results, next) = parse_results_page(&page).unwrap();
        let sites: Vec<&str> = results.iter().map(|r| r.site_name()).collect();
        assert_eq!(sites, vec!["a", "b", "c", "d"]);
        assert_eq!(results[3].status, TestStatus::Other("ABORT".into()));
        assert_eq!(next.as_deref(), Some("tok"));
    }

    #[test]
    fn empty_page_has_no_token() {
        let (results, next) = parse_results_page(&json!({})).unwrap();
        assert!(results.is_empty());
        assert!(next.is_none());
    }
}
