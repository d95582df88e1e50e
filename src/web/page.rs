use crate::client::BackendClient;
use crate::config::{COLUMNS_RANGE, INTERVAL_MS_RANGE, TIMEOUT_S_RANGE};
use crate::dashboard::{DashboardSnapshot, DashboardView};
use crate::grid::{GridView, StreamTile};

pub const STYLE_CSS: &str = r#"
/* SecureSurveillance dashboard */
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #1f2023; color: #e8e8e8; display: flex; min-height: 100vh; }
.sidebar { width: 280px; background: #2a2b2f; padding: 20px; display: flex; flex-direction: column; gap: 14px; }
.sidebar h2 { font-size: 16px; color: #a5b4fc; }
.sidebar label { font-size: 13px; display: flex; flex-direction: column; gap: 4px; }
.sidebar label.inline { flex-direction: row; align-items: center; gap: 8px; }
.sidebar input[type=text], .sidebar select { background: #1f2023; color: #e8e8e8; border: 1px solid #444; border-radius: 6px; padding: 6px; }
.sidebar select[multiple] { min-height: 120px; }
.btn { background: #667eea; color: white; border: none; padding: 8px 12px; border-radius: 6px; cursor: pointer; font-size: 13px; }
.btn:hover { background: #5a67d8; }
.btn-secondary { background: #48bb78; }
.main { flex: 1; padding: 20px 30px; }
.main h1 { margin-bottom: 16px; }
.run-state { font-size: 13px; color: #9ca3af; margin-bottom: 16px; }
.alert { padding: 14px 18px; border-radius: 8px; margin-bottom: 16px; }
.alert.error { background: #fed7d7; color: #742a2a; }
.alert.warning { background: #fefcbf; color: #744210; }
.alert.info { background: #bee3f8; color: #2a4365; }
.grid-row { display: grid; gap: 20px; margin-bottom: 20px; }
.tile { background: #2a2b2f; border-radius: 10px; padding: 14px; }
.tile h3 { margin-bottom: 10px; font-size: 16px; }
.tile code { display: block; font-size: 12px; background: #111; padding: 4px 6px; border-radius: 4px; margin-bottom: 6px; word-break: break-all; }
.video { width: 100%; height: auto; border-radius: 10px; background: #000; }
.meta-body { font-size: 12px; background: #111; padding: 8px; border-radius: 6px; margin-top: 10px; max-height: 240px; overflow: auto; white-space: pre-wrap; }
.caption { font-size: 12px; margin-top: 6px; color: #9ca3af; }
.caption.stale { color: #f6ad55; }
"#;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn checked(flag: bool) -> &'static str {
    if flag {
        "checked"
    } else {
        ""
    }
}

/// Whole dashboard page: control sidebar plus the current view.
pub fn render_page(snapshot: &DashboardSnapshot) -> String {
    let content = match &snapshot.view {
        DashboardView::Loading => {
            r#"<div class="alert info">Discovering streams…</div>"#.to_string()
        }
        DashboardView::DiscoveryFailed { message } => {
            format!(r#"<div class="alert error">{}</div>"#, escape_html(message))
        }
        DashboardView::EmptyCatalog => {
            r#"<div class="alert warning">No streams available.</div>"#.to_string()
        }
        DashboardView::EmptySelection => {
            r#"<div class="alert info">Select at least one stream.</div>"#.to_string()
        }
        DashboardView::Grid(grid) => render_grid(grid),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>SecureSurveillance</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    {sidebar}
    <div class="main">
        <h1>SecureSurveillance</h1>
        <div class="run-state" id="run-state">{run_state}</div>
        <div id="error-slot"></div>
        {content}
    </div>
    {script}
</body>
</html>
"#,
        sidebar = render_sidebar(snapshot),
        run_state = if snapshot.config.running { "Running" } else { "Paused" },
        content = content,
        script = render_script(snapshot.layout_version, snapshot.config.interval_ms),
    )
}

fn render_sidebar(snapshot: &DashboardSnapshot) -> String {
    let config = &snapshot.config;
    let options: String = snapshot
        .catalog
        .iter()
        .map(|stream_id| {
            let selected = if snapshot.selection.contains(stream_id) {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{id}"{selected}>{id}</option>"#,
                id = escape_html(stream_id.as_str()),
                selected = selected
            )
        })
        .collect();

    format!(
        r#"<div class="sidebar">
        <h2>Backend</h2>
        <label>Base URL
            <input type="text" id="base-url" value="{base_url}">
        </label>
        <button class="btn" onclick="connectBackend()">Connect</button>
        <label>Refresh interval (ms): <span id="interval-value">{interval}</span>
            <input type="range" id="interval" min="{interval_min}" max="{interval_max}" step="100" value="{interval}"
                oninput="document.getElementById('interval-value').textContent = this.value"
                onchange="updateConfig({{ interval_ms: Number(this.value) }})">
        </label>
        <label>HTTP timeout (s): <span id="timeout-value">{timeout:.1}</span>
            <input type="range" id="timeout" min="{timeout_min}" max="{timeout_max}" step="0.1" value="{timeout:.1}"
                oninput="document.getElementById('timeout-value').textContent = this.value"
                onchange="updateConfig({{ timeout_s: Number(this.value) }})">
        </label>
        <label>Grid columns: <span id="columns-value">{columns}</span>
            <input type="range" id="columns" min="{columns_min}" max="{columns_max}" step="1" value="{columns}"
                oninput="document.getElementById('columns-value').textContent = this.value"
                onchange="updateConfig({{ columns: Number(this.value) }})">
        </label>
        <label class="inline"><input type="checkbox" {show_meta} onchange="updateConfig({{ show_meta: this.checked }})"> Show metadata</label>
        <label class="inline"><input type="checkbox" {show_links} onchange="updateConfig({{ show_links: this.checked }})"> Show stream links</label>
        <label class="inline"><input type="checkbox" {running} onchange="updateConfig({{ running: this.checked }})"> Run</label>
        <h2>Streams</h2>
        <label>Select streams
            <select multiple id="selection">{options}</select>
        </label>
        <button class="btn" onclick="applySelection()">Apply selection</button>
        <button class="btn btn-secondary" onclick="rescan()">Rescan streams</button>
    </div>"#,
        base_url = escape_html(&snapshot.base_url),
        interval = config.interval_ms,
        interval_min = INTERVAL_MS_RANGE.0,
        interval_max = INTERVAL_MS_RANGE.1,
        timeout = config.timeout_s,
        timeout_min = TIMEOUT_S_RANGE.0,
        timeout_max = TIMEOUT_S_RANGE.1,
        columns = config.columns,
        columns_min = COLUMNS_RANGE.0,
        columns_max = COLUMNS_RANGE.1,
        show_meta = checked(config.show_meta),
        show_links = checked(config.show_links),
        running = checked(config.running),
        options = options,
    )
}

/// Grid of tiles. Panel element ids are keyed by slot so the poller can
/// swap their text without touching the `<img>` elements.
pub fn render_grid(grid: &GridView) -> String {
    grid.rows
        .iter()
        .map(|row| {
            let tiles: String = row.iter().map(|tile| render_tile(grid, tile)).collect();
            format!(
                r#"<div class="grid-row" style="grid-template-columns: repeat({}, 1fr);">{}</div>"#,
                grid.columns, tiles
            )
        })
        .collect()
}

fn render_tile(grid: &GridView, tile: &StreamTile) -> String {
    let links = if grid.show_links {
        format!(
            "<code>{}</code><code>{}</code>",
            escape_html(&tile.endpoints.video_url),
            escape_html(&tile.endpoints.meta_url)
        )
    } else {
        String::new()
    };

    let metadata = match &tile.metadata {
        Some(panel) => format!(
            r#"<pre class="meta-body" id="meta-body-{slot}">{body}</pre>
            <div class="caption{stale}" id="meta-caption-{slot}">{caption}</div>"#,
            slot = tile.slot,
            body = escape_html(&panel.body),
            stale = if panel.status.is_stale() { " stale" } else { "" },
            caption = escape_html(&panel.caption),
        ),
        None => String::new(),
    };

    format!(
        r#"<div class="tile" id="tile-{slot}">
            <h3>{id}</h3>
            {links}
            <img class="video" src="{video}" alt="{id}">
            {metadata}
        </div>"#,
        slot = tile.slot,
        id = escape_html(tile.stream_id.as_str()),
        links = links,
        video = escape_html(BackendClient::video_url(&tile.endpoints)),
        metadata = metadata,
    )
}

fn render_script(layout_version: u64, interval_ms: u64) -> String {
    format!(
        r#"<script>
        const LAYOUT_VERSION = {layout_version};
        let intervalMs = {interval_ms};

        function showError(message) {{
            document.getElementById('error-slot').innerHTML = '';
            const box = document.createElement('div');
            box.className = 'alert error';
            box.textContent = message;
            document.getElementById('error-slot').appendChild(box);
        }}

        async function post(path, body) {{
            const response = await fetch(path, {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify(body || {{}})
            }});
            if (!response.ok) {{
                const result = await response.json().catch(() => ({{ error: response.statusText }}));
                showError(result.error);
            }}
            await poll(false);
        }}

        function connectBackend() {{
            post('/api/base-url', {{ base_url: document.getElementById('base-url').value }});
        }}

        function updateConfig(patch) {{
            post('/api/config', patch);
        }}

        function applySelection() {{
            const streams = Array.from(document.getElementById('selection').selectedOptions).map(o => o.value);
            post('/api/selection', {{ streams }});
        }}

        function rescan() {{
            post('/api/rescan');
        }}

        // Only panel text is replaced here; video elements stay mounted.
        async function poll(reschedule) {{
            try {{
                const response = await fetch('/api/panels');
                const data = await response.json();
                if (data.layout_version !== LAYOUT_VERSION) {{
                    window.location.reload();
                    return;
                }}
                intervalMs = data.interval_ms;
                document.getElementById('run-state').textContent = data.running ? 'Running' : 'Paused';
                data.panels.forEach((panel, slot) => {{
                    const body = document.getElementById('meta-body-' + slot);
                    const caption = document.getElementById('meta-caption-' + slot);
                    if (body) body.textContent = panel.body;
                    if (caption) {{
                        caption.textContent = panel.caption;
                        caption.className = panel.status.state === 'stale' ? 'caption stale' : 'caption';
                    }}
                }});
            }} catch (e) {{
                // Dashboard unreachable; keep showing the last panels.
            }}
            if (reschedule) setTimeout(() => poll(true), intervalMs);
        }}

        setTimeout(() => poll(true), intervalMs);
    </script>"#,
        layout_version = layout_version,
        interval_ms = interval_ms,
    )
}
