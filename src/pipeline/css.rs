//! Stylesheets for rendered documents.
//!
//! [`DOCUMENT_FULL_CSS`] is injected into standalone HTML output;
//! [`DOCUMENT_SCOPED_CSS`] styles the off-screen screenshot container under
//! the `.doc-render` class. Tables with a header row get full cell borders
//! and header shading; header-less layout tables stay borderless.

/// Class of the screenshot container that [`DOCUMENT_SCOPED_CSS`] targets.
pub const RENDER_CLASS: &str = "doc-render";

pub const DOCUMENT_FULL_CSS: &str = r#"
/* ── Page Layout ── */
html {
  background: #f5f5f5;
}
body {
  max-width: 794px;
  margin: 20px auto;
  padding: 40px 50px;
  background: #ffffff;
  box-shadow: 0 1px 4px rgba(0,0,0,0.12);
  font-family: 'Segoe UI', 'Noto Sans', Tahoma, Geneva, Verdana, sans-serif;
  font-size: 14px;
  line-height: 1.65;
  color: #1a1a1a;
  -webkit-font-smoothing: antialiased;
}

/* ── Typography ── */
h1, h2, h3, h4, h5, h6 {
  margin-top: 1em;
  margin-bottom: 0.4em;
  color: #111;
  font-weight: 600;
  line-height: 1.3;
}
h1 { font-size: 20px; }
h2 { font-size: 18px; }
h3 { font-size: 16px; }
h4 { font-size: 15px; }
p { margin: 0.4em 0; orphans: 2; widows: 2; }
p[style*="text-align: center"], p[style*="text-align:center"] {
  text-align: center !important;
}

/* ── Lists ── */
ul, ol { padding-left: 2em; margin: 0.4em 0; }
li { margin: 0.15em 0; }

/* ── Tables ── */
table {
  border-collapse: collapse;
  margin: 0.8em 0;
  width: 100%;
  page-break-inside: avoid;
}
th, td { padding: 6px 10px; text-align: left; vertical-align: top; }
table:has(thead) th, table:has(thead) td,
table:has(th) th, table:has(th) td {
  border: 1px solid #666;
}
table:has(thead) th, table:has(th) th {
  background-color: #f0f0f0;
  font-weight: 600;
  color: #222;
}
table:not(:has(thead)):not(:has(th)) { border: none; }
table:not(:has(thead)):not(:has(th)) td {
  border: none;
  padding: 2px 6px;
  vertical-align: top;
}

/* ── Images ── */
img { max-width: 100%; height: auto; display: inline-block; }
figure { margin: 0.8em 0; text-align: center; }
figcaption { font-size: 12px; color: #666; margin-top: 0.3em; font-style: italic; }

/* ── Code ── */
pre {
  background: #f6f8fa;
  padding: 12px;
  border-radius: 4px;
  overflow-x: auto;
  font-size: 13px;
  margin: 0.6em 0;
  border: 1px solid #e1e4e8;
}
code {
  font-family: 'Consolas', 'Monaco', 'Courier New', monospace;
  font-size: 13px;
  background: #f0f0f0;
  padding: 2px 4px;
  border-radius: 3px;
}
pre code { background: none; padding: 0; }

/* ── Blockquote ── */
blockquote {
  border-left: 4px solid #ccc;
  margin: 0.6em 0;
  padding: 0.4em 1em;
  color: #444;
  background: #f9f9f9;
}

/* ── Links and rules ── */
a { color: #0366d6; text-decoration: none; }
a:hover { text-decoration: underline; }
hr { border: none; border-top: 1px solid #ddd; margin: 1.5em 0; }

/* ── Alignment and emphasis ── */
[style*="text-align"] { text-align: inherit; }
.center, [align="center"] { text-align: center; }
.right, [align="right"] { text-align: right; }
strong, b { font-weight: 700; }
u { text-decoration: underline; }
"#;

pub const DOCUMENT_SCOPED_CSS: &str = r#"
.doc-render * { box-sizing: border-box; }
.doc-render {
  font-family: 'Segoe UI', 'Noto Sans', Tahoma, Geneva, Verdana, sans-serif;
  font-size: 14px;
  line-height: 1.65;
  color: #1a1a1a;
}
.doc-render h1, .doc-render h2, .doc-render h3, .doc-render h4, .doc-render h5, .doc-render h6 {
  margin-top: 1em; margin-bottom: 0.4em; color: #111; font-weight: 600; line-height: 1.3;
}
.doc-render h1 { font-size: 20px; }
.doc-render h2 { font-size: 18px; }
.doc-render h3 { font-size: 16px; }
.doc-render h4 { font-size: 15px; }
.doc-render p { margin: 0.4em 0; }
.doc-render p[style*="text-align: center"], .doc-render p[style*="text-align:center"] {
  text-align: center !important;
}
.doc-render ul, .doc-render ol { padding-left: 2em; margin: 0.4em 0; }
.doc-render li { margin: 0.15em 0; }
.doc-render table { border-collapse: collapse; margin: 0.8em 0; width: 100%; page-break-inside: avoid; }
.doc-render th, .doc-render td { padding: 6px 10px; text-align: left; vertical-align: top; }
.doc-render table:has(thead) th, .doc-render table:has(thead) td,
.doc-render table:has(th) th, .doc-render table:has(th) td {
  border: 1px solid #666;
}
.doc-render table:has(thead) th, .doc-render table:has(th) th {
  background-color: #f0f0f0; font-weight: 600; color: #222;
}
.doc-render table:not(:has(thead)):not(:has(th)) { border: none; }
.doc-render table:not(:has(thead)):not(:has(th)) td { border: none; padding: 2px 6px; }
.doc-render img { max-width: 100%; height: auto; display: inline-block; }
.doc-render figure { margin: 0.8em 0; text-align: center; }
.doc-render figcaption { font-size: 12px; color: #666; margin-top: 0.3em; font-style: italic; }
.doc-render pre {
  background: #f6f8fa; padding: 12px; border-radius: 4px;
  overflow-x: auto; font-size: 13px; margin: 0.6em 0; border: 1px solid #e1e4e8;
}
.doc-render code {
  font-family: 'Consolas', 'Monaco', 'Courier New', monospace;
  font-size: 13px; background: #f0f0f0; padding: 2px 4px; border-radius: 3px;
}
.doc-render pre code { background: none; padding: 0; }
.doc-render blockquote {
  border-left: 4px solid #ccc; margin: 0.6em 0; padding: 0.4em 1em; color: #444; background: #f9f9f9;
}
.doc-render a { color: #0366d6; text-decoration: none; }
.doc-render .center, .doc-render [align="center"] { text-align: center; }
.doc-render .right, .doc-render [align="right"] { text-align: right; }
.doc-render strong, .doc-render b { font-weight: 700; }
.doc-render u { text-decoration: underline; }
"#;
