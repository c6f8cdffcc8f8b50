//! End-to-end flows over the reqwest transport against a local mock server.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use mockito::{Matcher, Server};
use serde_json::json;
use tempfile::TempDir;

use cmdb_tools::client::{ClientConfig, ReqwestTransport};
use cmdb_tools::{CmdbClient, CmdbError, CredentialStore, HttpTransport, Session};

const RECORD: &str =
    r#"[{"allele_num": 100, "allele_count": 5, "allele_freq": 0.05, "filter_status": 0}]"#;

fn api_url(server: &Server) -> String {
    format!("{}/cmdb/api/v1.0", server.url())
}

fn session(server: &Server, home: &TempDir) -> Session {
    let client = CmdbClient::with_config(ClientConfig::with_api_url(api_url(server))).unwrap();
    Session::new(client, CredentialStore::new(home.path().join(".cmdb")))
}

fn position_query(chromosome_position: &str, token: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("type".into(), "position".into()),
        Matcher::UrlEncoded("query".into(), chromosome_position.into()),
        Matcher::UrlEncoded("token".into(), token.into()),
    ])
}

#[tokio::test]
async fn test_login_stores_accepted_token() {
    let mut server = Server::new_async().await;
    let canary = server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(position_query("chr17-41234470", "good-token"))
        .with_status(201)
        .with_body(RECORD)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    session.login("good-token").await.unwrap();
    canary.assert_async().await;

    let record = session.credential().unwrap();
    assert_eq!(record.access_token, "good-token");
    assert_eq!(record.version, "CMDB_hg19_v1.0");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let file_mode = std::fs::metadata(session.store().path()).unwrap().permissions().mode();
        let dir_mode = std::fs::metadata(session.store().dir()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}

#[tokio::test]
async fn test_login_rejected_token_writes_nothing() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error": "Invalid token."}"#)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    let err = session.login("bad-token").await.unwrap_err();

    assert!(matches!(err, CmdbError::Auth { status: 403 }));
    assert!(!session.store().exists());
}

#[tokio::test]
async fn test_relogin_replaces_token() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(Matcher::Any)
        .with_status(201)
        .with_body(RECORD)
        .expect(2)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    session.login("first").await.unwrap();
    session.login("second").await.unwrap();
    assert_eq!(session.access_token().unwrap(), "second");
}

#[tokio::test]
async fn test_query_variant_after_login() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(position_query("chr17-41234470", "t0k"))
        .with_status(201)
        .with_body(RECORD)
        .expect(2)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    session.login("t0k").await.unwrap();

    let body = session
        .query_variant(Some("chr17"), Some(41234470))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body[0]["allele_num"], json!(100));
}

#[tokio::test]
async fn test_query_variant_without_login_makes_no_request() {
    let mut server = Server::new_async().await;
    let lookup = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let err = session(&server, &home)
        .query_variant(Some("chr1"), Some(100))
        .await
        .unwrap_err();

    assert!(matches!(err, CmdbError::NotLoggedIn));
    lookup.assert_async().await;
}

#[tokio::test]
async fn test_forbidden_lookup_surfaces_server_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error": "Daily query limit reached."}"#)
        .create_async()
        .await;

    let client = CmdbClient::with_config(ClientConfig::with_api_url(api_url(&server))).unwrap();
    let err = client
        .query_variant_by_position("t0k", "chr1", 100)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Daily query limit reached.");
}

#[tokio::test]
async fn test_region_follows_next_cursor() {
    let mut server = Server::new_async().await;
    let page2_url = format!("{}/cmdb/api/v1.0/region/page/2", server.url());

    let first = server
        .mock("GET", "/cmdb/api/v1.0/region")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("chrom".into(), "chr17".into()),
            Matcher::UrlEncoded("start".into(), "41234470".into()),
            Matcher::UrlEncoded("end".into(), "41242470".into()),
            Matcher::UrlEncoded("vcf".into(), "0".into()),
        ]))
        .match_header("authorization", "Bearer t0k")
        .with_status(200)
        .with_body(
            json!({
                "format": "json",
                "data": [{"variant_id": "chr17-41234470-A-G"}, {"variant_id": "chr17-41234500-C-T"}],
                "next": page2_url,
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", "/cmdb/api/v1.0/region/page/2")
        .match_header("authorization", "Bearer t0k")
        .with_status(200)
        .with_body(r#"{"format": "json", "data": [{"variant_id": "chr17-41240000-G-A"}]}"#)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    session.store().create().unwrap();
    session.store().write("t0k").unwrap();

    let region = session.load_region("chr17", 41234470).await.unwrap();
    first.assert_async().await;
    second.assert_async().await;

    assert_eq!(region.start, 41234470);
    assert_eq!(region.end, 41242470);
    let ids: Vec<&str> = region.variants.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        ["chr17-41234470-A-G", "chr17-41234500-C-T", "chr17-41240000-G-A"]
    );
}

#[tokio::test]
async fn test_region_rejection_uses_default_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cmdb/api/v1.0/region")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body("not json")
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    session.store().create().unwrap();
    session.store().write("t0k").unwrap();

    let err = session
        .region_rows("chr1", 1, 10, false)
        .unwrap()
        .collect_all()
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to query data.");
}

#[tokio::test]
async fn test_annotate_gzip_file() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(position_query("chr1-100", "t0k"))
        .with_status(201)
        .with_body(RECORD)
        .create_async()
        .await;
    server
        .mock("GET", "/cmdb/api/v1.0/variant")
        .match_query(position_query("chr1-200", "t0k"))
        .with_status(404)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let session = session(&server, &home);
    session.store().create().unwrap();
    session.store().write("t0k").unwrap();

    let input = home.path().join("calls.vcf.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&input).unwrap(), Compression::default());
    encoder
        .write_all(
            b"##fileformat=VCFv4.2\n\
              #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
              chr1\t100\t.\tA\tT\t.\t.\tDP=10\n\
              chr1\t200\t.\tG\tC\t.\t.\tDP=4\n",
        )
        .unwrap();
    encoder.finish().unwrap();

    let mut output = Vec::new();
    let summary = session.annotate(&input, None, &mut output).await.unwrap();
    let output = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(summary.annotated, 1);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(lines.len(), 8);
    assert_eq!(
        lines[6],
        "chr1\t100\t.\tA\tT\t.\t.\tCMDB_AC=5;CMDB_AF=0.05;CMDB_AN=100;CMDB_FILTER=0;DP=10"
    );
    assert_eq!(lines[7], "chr1\t200\t.\tG\tC\t.\t.\tDP=4");
}

#[tokio::test]
async fn test_reqwest_transport_posts_form() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/form")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::UrlEncoded("token".into(), "a b&c".into()))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let url = format!("{}/form", server.url());
    let response = transport
        .post(&url, &http::HeaderMap::new(), &[("token", "a b&c")])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_reqwest_transport_keeps_error_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("gone")
        .create_async()
        .await;

    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let url = format!("{}/missing", server.url());
    let response = transport.get(&url, &http::HeaderMap::new(), &[]).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(&response.body[..], b"gone");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
    let err = transport
        .get("http://127.0.0.1:1/variant", &http::HeaderMap::new(), &[])
        .await
        .unwrap_err();
    assert!(err.is_transport());
}
