//! HTML documents used across integration tests.

/// Base URL the published fixtures pretend to live at
pub const DOC_BASE: &str = "https://www.w3.org/TR/2021/WD-fancy-20210512/";

/// A Working Draft with a complete head block and SOTD
pub fn working_draft() -> String {
    r##"<!DOCTYPE html>
<html><head><title>Fancy Spec</title></head>
<body>
<div class="head">
  <a href="https://www.w3.org/"><img src="https://www.w3.org/StyleSheets/TR/2021/logos/W3C" alt="W3C"></a>
  <h1 id="title">Fancy Spec</h1>
  <p id="w3c-state">W3C Working Draft, 12 May 2021</p>
  <dl>
    <dt>This version:</dt>
    <dd><a href="https://www.w3.org/TR/2021/WD-fancy-20210512/">https://www.w3.org/TR/2021/WD-fancy-20210512/</a></dd>
    <dt>Latest published version:</dt>
    <dd><a href="https://www.w3.org/TR/fancy/">https://www.w3.org/TR/fancy/</a></dd>
    <dt>Previous version:</dt>
    <dd><a href="https://www.w3.org/TR/2020/WD-fancy-20200101/">https://www.w3.org/TR/2020/WD-fancy-20200101/</a></dd>
    <dt>Editors:</dt>
    <dd class="editor" data-editor-id="42"><a href="#">Grace Hopper</a> (Navy)</dd>
    <dd class="editor" data-editor-id="7"><a href="#">Alan Turing</a> (NPL)</dd>
  </dl>
  <p class="copyright">Copyright 2021 W3C</p>
  <hr>
</div>
<section id="abstract"><h2>Abstract</h2><p>Fancy things.</p></section>
<section id="sotd"><h2>Status of This Document</h2>
  <p>This document was published by the Fancy Working Group as a Working Draft
  using the Recommendation track. Governed by the
  <a href="https://www.w3.org/2021/Process-20211102/">Process Document</a>.
  <span data-deliverer="1001"></span></p>
</section>
<nav id="toc"><h2 id="table-of-contents">Table of Contents</h2>
<ol class="toc"><li><a href="#intro"><span class="secno">1.</span> Introduction</a></li></ol></nav>
<section id="intro"><h2><span class="secno">1.</span> Introduction</h2><p>Hello.</p></section>
</body></html>"##
        .to_string()
}

/// Minimal document embedding the given image sources
pub fn with_images(sources: &[&str]) -> String {
    let images: String = sources
        .iter()
        .map(|src| format!("  <img src=\"{}\" alt=\"\">\n", src))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html><head><title>Images</title></head>\n<body>\n<div class=\"head\"><h1>Images</h1></div>\n{}</body></html>",
        images
    )
}

/// Minimal document with plain outbound links
pub fn with_links(hrefs: &[&str]) -> String {
    let links: String = hrefs
        .iter()
        .map(|href| format!("  <p><a href=\"{}\">link</a></p>\n", href))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html><head><title>Links</title></head>\n<body>\n{}</body></html>",
        links
    )
}
