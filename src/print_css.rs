//! The fixed print stylesheet and base URL every invocation uses.

/// Base URL that relative references in submitted documents resolve against.
pub const BASE_URL: &str = "https://demo.qandu.me/";

/// Label printed bottom-left on every page.
pub const BRAND_LABEL: &str = "Social Garden";

/// Print stylesheet applied after the document's own styles: A4 pages,
/// the running footer, and break avoidance for scope sections and tables.
pub const PRINT_CSS: &str = r#"
@page {
    size: A4;
    margin: 0.5in 0.5in 0.75in 0.5in;
    @bottom-center {
        content: "Page " counter(page) " of " counter(pages);
        font-size: 10px;
        color: #666;
    }
    @bottom-left {
        content: "Social Garden";
        font-size: 10px;
        font-weight: 600;
        color: #666;
    }
    @bottom-right {
        content: "CONFIDENTIAL";
        font-size: 10px;
        font-style: italic;
        color: #666;
    }
}
/* Prevent page breaks inside important elements */
.scope, .roles-table, .section {
    page-break-inside: avoid;
}
/* Ensure tables don't break badly */
table {
    page-break-inside: avoid;
}
thead {
    display: table-header-group;
}
tr {
    page-break-inside: avoid;
}
"#;
