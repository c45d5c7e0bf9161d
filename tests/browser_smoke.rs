//! End-to-end runs against a real Chromium and local stand-ins for both
//! portals. Run with `cargo test -- --ignored`.

use std::sync::Arc;
use veta_scrape::browser::BrowserSession;
use veta_scrape::config::LookupConfig;
use veta_scrape::lookup::{ActivityAlert, ReinfoLookup, ReinfoOutcome, SunatLookup};
use veta_scrape::portal::ChromeDriver;

const REINFO_FORM: &str = r#"<!DOCTYPE html>
<html><body>
  <input id="txtruc" type="text">
  <button id="btnBuscar" type="button">Buscar</button>
  <div id="results"></div>
  <script>
    document.getElementById('btnBuscar').addEventListener('click', function () {
      var ruc = document.getElementById('txtruc').value;
      document.getElementById('results').innerHTML =
        '<table id="stdregistro"><thead>' +
        '<tr><th rowspan="2">RUC</th><th colspan="2">DERECHO MINERO</th></tr>' +
        '<tr><th>Código Único</th><th>Nombre</th></tr></thead>' +
        '<tbody><tr><td>' + ruc + '</td><td>750012345</td><td>VETA ROSA</td></tr></tbody></table>';
    });
  </script>
</body></html>"#;

const SUNAT_FORM: &str = r#"<!DOCTYPE html>
<html><body>
  <form method="post" action="/cl-ti-itmrconsruc/jcrS00Alias">
    <input id="txtRuc" name="nroRuc" type="text">
    <button id="btnAceptar" type="submit">Buscar</button>
  </form>
</body></html>"#;

const SUNAT_RESULTS: &str = r#"<!DOCTYPE html>
<html><body><div class="panel panel-primary"><table>
  <tr><td>Actividad(es) Económica(s):</td></tr>
  <tr><td>Principal - 0729 - EXTRACCIÓN DE OTROS MINERALES METALÍFEROS NO FERROSOS</td></tr>
</table></div></body></html>"#;

#[tokio::test]
#[ignore] // Requires browser installation
async fn test_reinfo_lookup_in_chromium() {
    let mut server = mockito::Server::new_async().await;
    let _form = server
        .mock("GET", "/REINFO_WEB/Index.aspx")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(REINFO_FORM)
        .expect_at_least(2)
        .create_async()
        .await;

    let config = LookupConfig::builder()
        .without_pauses()
        .reinfo_url(format!("{}/REINFO_WEB/Index.aspx", server.url()))
        .build()
        .expect("valid config");
    let session = Arc::new(BrowserSession::new(config.browser().clone()));
    let lookup = ReinfoLookup::new(ChromeDriver::new(Arc::clone(&session)), config.reinfo().clone());

    let traced = lookup.lookup_traced("20606564016").await;
    session.close().await.expect("browser shuts down");

    assert_eq!(
        traced.outcome,
        ReinfoOutcome::Codes(vec!["750012345".to_string()]),
        "trace: {:?}",
        traced.trace
    );
}

#[tokio::test]
#[ignore] // Requires browser installation
async fn test_reinfo_unreachable_host() {
    let config = LookupConfig::builder()
        .without_pauses()
        .reinfo_url("http://127.0.0.1:9/REINFO_WEB/Index.aspx")
        .build()
        .expect("valid config");
    let session = Arc::new(BrowserSession::new(config.browser().clone()));
    let lookup = ReinfoLookup::new(ChromeDriver::new(Arc::clone(&session)), config.reinfo().clone());

    let outcome = lookup.lookup("20606564016").await;
    session.close().await.expect("browser shuts down");

    assert_eq!(outcome, ReinfoOutcome::SiteUnavailable);
}

#[tokio::test]
#[ignore] // Requires browser installation
async fn test_sunat_lookup_in_chromium() {
    let mut server = mockito::Server::new_async().await;
    let _form = server
        .mock("GET", "/cl-ti-itmrconsruc/FrameCriterioBusquedaWeb.jsp")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(SUNAT_FORM)
        .create_async()
        .await;
    let _results = server
        .mock("POST", "/cl-ti-itmrconsruc/jcrS00Alias")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(SUNAT_RESULTS)
        .create_async()
        .await;

    let config = LookupConfig::builder()
        .without_pauses()
        .sunat_url(format!(
            "{}/cl-ti-itmrconsruc/FrameCriterioBusquedaWeb.jsp",
            server.url()
        ))
        .build()
        .expect("valid config");
    let session = Arc::new(BrowserSession::new(config.browser().clone()));
    let lookup = SunatLookup::new(ChromeDriver::new(Arc::clone(&session)), config.sunat().clone());

    let record = lookup.lookup("20606564016").await;
    session.close().await.expect("browser shuts down");

    assert_eq!(record.alert, ActivityAlert::Normal);
    assert!(record.economic_activity.contains("EXTRACCIÓN"));
}
