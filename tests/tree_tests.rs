//! End-to-end sitemap tree tests against a mock HTTP server.

use usp::{sitemap_tree_for_homepage_with, Sitemap, TreeOptions, SITEMAP_PAGE_DEFAULT_PRIORITY};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a 200 response with the given body and content type.
async fn serve(server: &MockServer, url_path: &str, content_type: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), content_type))
        .mount(server)
        .await;
}

async fn build_tree(server: &MockServer) -> Sitemap {
    sitemap_tree_for_homepage_with(&server.uri(), None, TreeOptions::default())
        .await
        .expect("tree build failed")
}

fn urlset_with(urls: &[(&str, Option<&str>)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (loc, priority) in urls {
        body.push_str("<url>");
        body.push_str(&format!("<loc>{loc}</loc>"));
        if let Some(priority) = priority {
            body.push_str(&format!("<priority>{priority}</priority>"));
        }
        body.push_str("</url>\n");
    }
    body.push_str("</urlset>\n");
    body
}

#[tokio::test]
async fn test_single_sitemap_no_robots() {
    let server = MockServer::start().await;

    // robots.txt and the other well-known paths 404.
    serve(
        &server,
        "/sitemap.xml",
        "application/xml",
        &urlset_with(&[
            ("https://ex.org/a", Some("0.8")),
            ("https://ex.org/b", Some("0.8")),
        ]),
    )
    .await;

    let tree = build_tree(&server).await;

    assert!(matches!(tree, Sitemap::IndexWebsite(_)));
    assert_eq!(tree.sub_sitemaps().len(), 1);

    let child = &tree.sub_sitemaps()[0];
    assert!(matches!(child, Sitemap::PagesXml(_)));
    assert_eq!(child.url(), format!("{}/sitemap.xml", server.uri()));

    let pages = child.pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].url, "https://ex.org/a");
    assert_eq!(pages[0].priority, 0.8);
    assert_eq!(pages[1].url, "https://ex.org/b");
    assert_eq!(pages[1].priority, 0.8);
}

#[tokio::test]
async fn test_robots_declared_sitemap_not_reattached_from_known_paths() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/robots.txt",
        "text/plain",
        &format!("User-agent: *\nSitemap: {base}/sitemap.xml\n"),
    )
    .await;
    serve(
        &server,
        "/sitemap.xml",
        "application/xml",
        &urlset_with(&[("https://ex.org/a", None)]),
    )
    .await;

    let tree = build_tree(&server).await;

    // Exactly one child: the robots.txt index. The sitemap it declares is
    // inside it, not re-attached as a direct child of the root.
    assert_eq!(tree.sub_sitemaps().len(), 1);
    let robots = &tree.sub_sitemaps()[0];
    assert!(matches!(robots, Sitemap::IndexRobotsTxt(_)));
    assert_eq!(robots.sub_sitemaps().len(), 1);
    assert!(matches!(robots.sub_sitemaps()[0], Sitemap::PagesXml(_)));
}

#[tokio::test]
async fn test_index_with_cycling_middle_child() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/sitemap_index.xml",
        "application/xml",
        &format!(
            "<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
             <sitemap><loc>{base}/a.xml</loc></sitemap>\
             <sitemap><loc>{base}/sitemap_index.xml</loc></sitemap>\
             <sitemap><loc>{base}/c.xml</loc></sitemap>\
             </sitemapindex>"
        ),
    )
    .await;
    serve(
        &server,
        "/a.xml",
        "application/xml",
        &urlset_with(&[("https://ex.org/from-a", None)]),
    )
    .await;
    serve(
        &server,
        "/c.xml",
        "application/xml",
        &urlset_with(&[("https://ex.org/from-c", None)]),
    )
    .await;

    let tree = build_tree(&server).await;

    let index = &tree.sub_sitemaps()[0];
    assert!(matches!(index, Sitemap::IndexXml(_)));

    let children = index.sub_sitemaps();
    assert_eq!(children.len(), 3);

    assert!(matches!(children[0], Sitemap::PagesXml(_)));
    assert_eq!(children[0].url(), format!("{base}/a.xml"));

    assert!(children[1].is_invalid());
    assert_eq!(children[1].reason(), Some("recursive sitemap"));

    assert!(matches!(children[2], Sitemap::PagesXml(_)));
    assert_eq!(children[2].url(), format!("{base}/c.xml"));
}

#[tokio::test]
async fn test_truncated_urlset_keeps_parsed_pages() {
    let server = MockServer::start().await;

    let truncated = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\
        <url><loc>https://ex.org/1</loc></url>\n\
        <url><loc>https://ex.org/2</loc></url>\n\
        <url><loc>https://ex.org/3";
    serve(&server, "/sitemap.xml", "application/xml", truncated).await;

    let tree = build_tree(&server).await;
    let child = &tree.sub_sitemaps()[0];
    assert!(matches!(child, Sitemap::PagesXml(_)));

    let urls: Vec<String> = child.pages().into_iter().map(|p| p.url).collect();
    assert_eq!(urls, vec!["https://ex.org/1", "https://ex.org/2"]);
}

#[tokio::test]
async fn test_bogus_priority_and_timestamp_fall_back() {
    let server = MockServer::start().await;

    serve(
        &server,
        "/sitemap.xml",
        "application/xml",
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
         <url>\
         <loc>https://ex.org/page</loc>\
         <priority>bogus</priority>\
         <lastmod>not-a-date</lastmod>\
         </url>\
         </urlset>",
    )
    .await;

    let tree = build_tree(&server).await;
    let pages = tree.sub_sitemaps()[0].pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].priority, SITEMAP_PAGE_DEFAULT_PRIORITY);
    assert!(pages[0].last_modified.is_none());
}

#[tokio::test]
async fn test_list_and_url_filters_together() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/sitemap_index.xml",
        "application/xml",
        &format!(
            "<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
             <sitemap><loc>{base}/en/a</loc></sitemap>\
             <sitemap><loc>{base}/en/draft</loc></sitemap>\
             <sitemap><loc>{base}/fr/a</loc></sitemap>\
             </sitemapindex>"
        ),
    )
    .await;
    serve(
        &server,
        "/en/a",
        "application/xml",
        &urlset_with(&[("https://ex.org/en-page", None)]),
    )
    .await;

    // The filtered-out children must never be fetched.
    Mock::given(method("GET"))
        .and(path("/en/draft"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fr/a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = TreeOptions {
        list_filter: Some(Box::new(|urls, _level, _parents| {
            urls.into_iter().filter(|u| !u.contains("draft")).collect()
        })),
        url_filter: Some(Box::new(|url, _level, _parents| url.contains("/en/"))),
        ..TreeOptions::default()
    };

    let tree = sitemap_tree_for_homepage_with(&server.uri(), None, options)
        .await
        .unwrap();

    let index = &tree.sub_sitemaps()[0];
    assert_eq!(index.sub_sitemaps().len(), 1);
    assert_eq!(index.sub_sitemaps()[0].url(), format!("{base}/en/a"));
}

#[tokio::test]
async fn test_redirected_known_path_deduplicated_against_robots() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/robots.txt",
        "text/plain",
        &format!("Sitemap: {base}/real.xml\n"),
    )
    .await;
    serve(
        &server,
        "/real.xml",
        "application/xml",
        &urlset_with(&[("https://ex.org/a", None)]),
    )
    .await;
    // The well-known probe redirects onto the robots-declared sitemap.
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{base}/real.xml")),
        )
        .mount(&server)
        .await;

    let tree = build_tree(&server).await;

    // Only the robots.txt child; the redirected probe resolved to a URL
    // already reached through robots.txt and was skipped.
    assert_eq!(tree.sub_sitemaps().len(), 1);
    assert!(matches!(tree.sub_sitemaps()[0], Sitemap::IndexRobotsTxt(_)));
}

#[tokio::test]
async fn test_redirect_to_ancestor_is_a_cycle() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/sitemap_index.xml",
        "application/xml",
        &format!(
            "<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
             <sitemap><loc>{base}/alias.xml</loc></sitemap>\
             </sitemapindex>"
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/alias.xml"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{base}/sitemap_index.xml")),
        )
        .mount(&server)
        .await;

    let tree = build_tree(&server).await;
    let index = &tree.sub_sitemaps()[0];
    assert_eq!(index.sub_sitemaps().len(), 1);
    assert_eq!(index.sub_sitemaps()[0].reason(), Some("recursive sitemap"));
}

#[tokio::test]
async fn test_recursion_depth_bound() {
    let server = MockServer::start().await;
    let base = server.uri();

    // idx0 -> idx1 -> ... -> idx9 -> idx10; the last child sits one level
    // past the bound and must be refused without a fetch.
    for i in 0..10 {
        serve(
            &server,
            &format!("/idx{i}.xml"),
            "application/xml",
            &format!(
                "<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
                 <sitemap><loc>{base}/idx{}.xml</loc></sitemap>\
                 </sitemapindex>",
                i + 1
            ),
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/idx10.xml"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = TreeOptions {
        use_robots_txt: false,
        extra_known_paths: vec!["idx0.xml".to_string()],
        ..TreeOptions::default()
    };
    let tree = sitemap_tree_for_homepage_with(&server.uri(), None, options)
        .await
        .unwrap();

    let mut node = &tree.sub_sitemaps()[0];
    for _ in 0..9 {
        assert!(matches!(node, Sitemap::IndexXml(_)));
        node = &node.sub_sitemaps()[0];
    }
    let refused = &node.sub_sitemaps()[0];
    assert_eq!(refused.reason(), Some("recursion depth exceeded"));
}

#[tokio::test]
async fn test_gzipped_sitemap_is_decompressed() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let server = MockServer::start().await;

    let body = urlset_with(&[("https://ex.org/zipped", None)]);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml.gz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(compressed, "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let tree = build_tree(&server).await;
    let child = &tree.sub_sitemaps()[0];
    assert!(matches!(child, Sitemap::PagesXml(_)));
    assert_eq!(child.pages()[0].url, "https://ex.org/zipped");
}

#[tokio::test]
async fn test_plain_text_and_feed_sitemaps_via_robots() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/robots.txt",
        "text/plain",
        &format!("Sitemap: {base}/pages.txt\nSitemap: {base}/feed.rss\nSitemap: {base}/feed.atom\n"),
    )
    .await;
    serve(
        &server,
        "/pages.txt",
        "text/plain",
        "https://ex.org/t1\nnot a url\nhttps://ex.org/t2\n",
    )
    .await;
    serve(
        &server,
        "/feed.rss",
        "application/rss+xml",
        "<rss version=\"2.0\"><channel>\
         <item><title>One</title><description>d</description><link>https://ex.org/r1</link></item>\
         </channel></rss>",
    )
    .await;
    serve(
        &server,
        "/feed.atom",
        "application/atom+xml",
        "<feed xmlns=\"http://www.w3.org/2005/Atom\">\
         <entry><title>One</title><link rel=\"alternate\" href=\"https://ex.org/at1\"/></entry>\
         </feed>",
    )
    .await;

    let tree = build_tree(&server).await;
    let robots = &tree.sub_sitemaps()[0];
    let children = robots.sub_sitemaps();
    assert_eq!(children.len(), 3);
    assert!(matches!(children[0], Sitemap::PagesText(_)));
    assert!(matches!(children[1], Sitemap::PagesRss(_)));
    assert!(matches!(children[2], Sitemap::PagesAtom(_)));

    let all_urls: Vec<String> = tree.all_pages().map(|p| p.url).collect();
    assert_eq!(
        all_urls,
        vec![
            "https://ex.org/t1",
            "https://ex.org/t2",
            "https://ex.org/r1",
            "https://ex.org/at1",
        ]
    );
}

#[tokio::test]
async fn test_non_404_http_failure_attaches_invalid_sitemap() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden.xml"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let options = TreeOptions {
        use_robots_txt: false,
        extra_known_paths: vec!["forbidden.xml".to_string()],
        ..TreeOptions::default()
    };
    let tree = sitemap_tree_for_homepage_with(&server.uri(), None, options)
        .await
        .unwrap();

    assert_eq!(tree.sub_sitemaps().len(), 1);
    let child = &tree.sub_sitemaps()[0];
    assert!(child.is_invalid());
    assert!(child.reason().unwrap().contains("403"));
}

#[tokio::test]
async fn test_retryable_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    serve(
        &server,
        "/sitemap.xml",
        "application/xml",
        &urlset_with(&[("https://ex.org/recovered", None)]),
    )
    .await;

    let tree = build_tree(&server).await;
    let child = &tree.sub_sitemaps()[0];
    assert!(matches!(child, Sitemap::PagesXml(_)));
    assert_eq!(child.pages()[0].url, "https://ex.org/recovered");
}

#[tokio::test]
async fn test_html_body_at_sitemap_path_is_invalid() {
    let server = MockServer::start().await;

    serve(
        &server,
        "/sitemap.xml",
        "text/html",
        "<html><body>Mislabelled page</body></html>",
    )
    .await;

    let tree = build_tree(&server).await;
    assert_eq!(tree.sub_sitemaps().len(), 1);
    assert!(tree.sub_sitemaps()[0].is_invalid());
}

#[tokio::test]
async fn test_non_xml_non_robots_body_yields_empty_text_sitemap() {
    let server = MockServer::start().await;

    serve(&server, "/sitemap.xml", "text/plain", "nothing useful here\n").await;

    let tree = build_tree(&server).await;
    let child = &tree.sub_sitemaps()[0];
    assert!(matches!(child, Sitemap::PagesText(_)));
    assert!(child.pages().is_empty());
}

#[tokio::test]
async fn test_tree_serde_round_trip() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/robots.txt",
        "text/plain",
        &format!("Sitemap: {base}/sitemap.xml\n"),
    )
    .await;
    serve(
        &server,
        "/sitemap.xml",
        "application/xml",
        &urlset_with(&[("https://ex.org/a", Some("0.7")), ("https://ex.org/b", None)]),
    )
    .await;

    let tree = build_tree(&server).await;
    let json = serde_json::to_string(&tree).unwrap();
    let restored: Sitemap = serde_json::from_str(&json).unwrap();
    assert_eq!(tree, restored);
}

#[tokio::test]
async fn test_universal_invariants() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/robots.txt",
        "text/plain",
        &format!("Sitemap: {base}/sitemap_index.xml\n"),
    )
    .await;
    serve(
        &server,
        "/sitemap_index.xml",
        "application/xml",
        &format!(
            "<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
             <sitemap><loc>{base}/a.xml</loc></sitemap>\
             <sitemap><loc>{base}/a.xml</loc></sitemap>\
             <sitemap><loc>{base}/missing.xml</loc></sitemap>\
             </sitemapindex>"
        ),
    )
    .await;
    serve(
        &server,
        "/a.xml",
        "application/xml",
        &urlset_with(&[
            ("https://ex.org/1", None),
            ("https://ex.org/1", Some("0.2")),
            ("https://ex.org/2", None),
        ]),
    )
    .await;

    let tree = build_tree(&server).await;
    assert!(matches!(tree, Sitemap::IndexWebsite(_)));

    // Index nodes have no pages, page nodes have no sub-sitemaps, and no
    // node has two children (or two pages) with the same URL.
    let mut nodes: Vec<&Sitemap> = vec![&tree];
    nodes.extend(tree.all_sitemaps());
    for node in nodes {
        if !node.sub_sitemaps().is_empty() {
            assert!(node.pages().is_empty());
        }

        let child_urls: Vec<&str> = node.sub_sitemaps().iter().map(|c| c.url()).collect();
        let mut deduped = child_urls.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(child_urls.len(), deduped.len(), "duplicate child URLs");

        let page_urls: Vec<String> = node.pages().into_iter().map(|p| p.url).collect();
        let mut deduped_pages = page_urls.clone();
        deduped_pages.sort();
        deduped_pages.dedup();
        assert_eq!(page_urls.len(), deduped_pages.len(), "duplicate page URLs");
    }

    // all_pages is the depth-first concatenation of each leaf's pages.
    let collected: Vec<String> = tree.all_pages().map(|p| p.url).collect();
    assert_eq!(collected, vec!["https://ex.org/1", "https://ex.org/2"]);
}
