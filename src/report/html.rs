//! Self-contained HTML dashboards: one file, embedded JSON, Chart.js from CDN.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

const STYLE: &str = r#"
        :root {
            --bg: #0f1115;
            --card-bg: #1a1d24;
            --border: #2d333b;
            --text: #e6e8eb;
            --text-secondary: #949ba4;
            --accent: #7c3aed;
            --accent-light: #a78bfa;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            background: var(--bg);
            color: var(--text);
            padding: 24px;
        }

        .container { max-width: 1100px; margin: 0 auto; }

        header { margin-bottom: 24px; }
        header h1 { font-size: 1.6rem; }
        header .subtitle { color: var(--text-secondary); margin-top: 4px; }

        .stats {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 16px;
            margin-bottom: 24px;
        }

        .stat-card {
            background: var(--card-bg);
            border: 1px solid var(--border);
            border-radius: 8px;
            padding: 16px;
        }

        .stat-card h3 {
            color: var(--text-secondary);
            font-size: 0.75rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }

        .stat-card .value { font-size: 1.5rem; font-weight: 700; margin-top: 8px; }
        .stat-card .subvalue { color: var(--text-secondary); font-size: 0.8rem; margin-top: 4px; }

        .charts {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(420px, 1fr));
            gap: 16px;
        }

        .card {
            background: var(--card-bg);
            border: 1px solid var(--border);
            border-radius: 8px;
            padding: 16px;
        }

        .card h2 { font-size: 1rem; margin-bottom: 12px; }
        .chart-container { position: relative; height: 300px; width: 100%; }
        .wide { grid-column: 1 / -1; }
"#;

const PALETTE: &str = r#"['#c4b5fd', '#a78bfa', '#8b5cf6', '#7c3aed', '#6d28d9',
                      '#5b21b6', '#4c1d95', '#86efac', '#22c55e', '#0ea5e9',
                      '#f59e0b', '#f43f5e', '#e879f9', '#14b8a6', '#64748b']"#;

const CONVERSATION_SCRIPTS: &str = r#"
<script>
    const data = JSON_DATA_PLACEHOLDER;
    const palette = COLOR_PALETTE;

    const topics = Object.entries(data.by_topic)
        .sort((a, b) => b[1].count - a[1].count);
    const labels = topics.map(([name]) => name);

    document.getElementById('statConversations').textContent =
        data.summary.total_conversations.toLocaleString();
    document.getElementById('statMessages').textContent =
        data.summary.total_messages.toLocaleString();
    document.getElementById('statTokens').textContent =
        data.summary.total_estimated_tokens.toLocaleString();
    document.getElementById('statCost').textContent =
        '$' + data.summary.total_estimated_cost.toFixed(2);
    document.getElementById('statEnergy').textContent =
        data.summary.energy.total_wh.toFixed(1) + ' Wh';
    document.getElementById('statEnergySub').textContent =
        data.summary.energy.equivalent_phone_charges.toFixed(1) + ' phone charges';

    new Chart(document.getElementById('topicPieChart'), {
        type: 'doughnut',
        data: {
            labels: labels,
            datasets: [{
                data: topics.map(([, t]) => t.count),
                backgroundColor: palette,
                borderWidth: 0
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            plugins: { legend: { position: 'right', labels: { color: '#949ba4', boxWidth: 10 } } }
        }
    });

    new Chart(document.getElementById('messagesBarChart'), {
        type: 'bar',
        data: {
            labels: labels,
            datasets: [{
                label: 'Messages',
                data: topics.map(([, t]) => t.messages),
                backgroundColor: '#7c3aed',
                borderRadius: 4
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            indexAxis: 'y',
            plugins: { legend: { display: false } },
            scales: {
                x: { beginAtZero: true, grid: { color: '#2d333b' } },
                y: { ticks: { color: '#949ba4' }, grid: { display: false } }
            }
        }
    });

    new Chart(document.getElementById('tokensBarChart'), {
        type: 'bar',
        data: {
            labels: labels,
            datasets: [{
                label: 'Estimated Tokens',
                data: topics.map(([, t]) => t.estimated_tokens),
                backgroundColor: '#22c55e',
                borderRadius: 4
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            indexAxis: 'y',
            plugins: { legend: { display: false } },
            scales: {
                x: { beginAtZero: true, grid: { color: '#2d333b' } },
                y: { ticks: { color: '#949ba4' }, grid: { display: false } }
            }
        }
    });

    new Chart(document.getElementById('timelineChart'), {
        type: 'line',
        data: {
            labels: data.timeline.map(d => d.date),
            datasets: [{
                label: 'Conversations',
                data: data.timeline.map(d => d.total),
                borderColor: '#a78bfa',
                backgroundColor: 'rgba(124, 58, 237, 0.1)',
                tension: 0.3,
                fill: true
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            plugins: { legend: { display: false } },
            scales: {
                y: { beginAtZero: true, grid: { color: '#2d333b' } },
                x: { ticks: { color: '#949ba4', maxTicksLimit: 15 }, grid: { display: false } }
            }
        }
    });
</script>
"#;

const PROJECT_SCRIPTS: &str = r#"
<script>
    const data = JSON_DATA_PLACEHOLDER;
    const palette = COLOR_PALETTE;

    const projects = Object.entries(data.by_project)
        .sort((a, b) => b[1].tokens.total - a[1].tokens.total);
    const names = projects.map(([name]) => name);

    document.getElementById('statProjects').textContent =
        data.summary.total_projects.toLocaleString();
    document.getElementById('statSessions').textContent =
        data.summary.total_conversations.toLocaleString();
    document.getElementById('statTokens').textContent =
        data.summary.tokens.total.toLocaleString();
    document.getElementById('statCost').textContent =
        '$' + data.summary.cost_estimate.toFixed(2);
    document.getElementById('statEnergy').textContent =
        data.summary.energy_wh.toFixed(1) + ' Wh';
    document.getElementById('statEnergySub').textContent =
        data.summary.phone_charges_equiv.toFixed(1) + ' phone charges';

    new Chart(document.getElementById('projectPieChart'), {
        type: 'doughnut',
        data: {
            labels: names,
            datasets: [{
                data: projects.map(([, p]) => p.tokens.total),
                backgroundColor: palette,
                borderWidth: 0
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            plugins: { legend: { position: 'right', labels: { color: '#949ba4', boxWidth: 10 } } }
        }
    });

    new Chart(document.getElementById('tokenTypesChart'), {
        type: 'bar',
        data: {
            labels: names,
            datasets: [
                { label: 'Input', data: projects.map(([, p]) => p.tokens.input),
                  backgroundColor: '#7c3aed' },
                { label: 'Output', data: projects.map(([, p]) => p.tokens.output),
                  backgroundColor: '#22c55e' },
                { label: 'Cache Read', data: projects.map(([, p]) => p.tokens.cache_read),
                  backgroundColor: '#0ea5e9' }
            ]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            plugins: { legend: { labels: { color: '#949ba4' } } },
            scales: {
                x: { stacked: true, ticks: { color: '#949ba4' }, grid: { display: false } },
                y: { stacked: true, beginAtZero: true, grid: { color: '#2d333b' } }
            }
        }
    });

    new Chart(document.getElementById('energyChart'), {
        type: 'bar',
        data: {
            labels: names,
            datasets: [{
                label: 'Energy (Wh)',
                data: projects.map(([, p]) => p.energy_wh),
                backgroundColor: '#f59e0b',
                borderRadius: 4
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            plugins: { legend: { display: false } },
            scales: {
                y: { beginAtZero: true, grid: { color: '#2d333b' } },
                x: { ticks: { color: '#949ba4' }, grid: { display: false } }
            }
        }
    });

    const top = data.top_consumers.slice(0, 10);
    new Chart(document.getElementById('topConsumersChart'), {
        type: 'bar',
        data: {
            labels: top.map(c => c.title.length > 40 ? c.title.slice(0, 40) + '…' : c.title),
            datasets: [{
                label: 'Total Tokens',
                data: top.map(c => c.total_tokens),
                backgroundColor: '#a78bfa',
                borderRadius: 4
            }]
        },
        options: {
            responsive: true,
            maintainAspectRatio: false,
            indexAxis: 'y',
            plugins: { legend: { display: false } },
            scales: {
                x: { beginAtZero: true, grid: { color: '#2d333b' } },
                y: { ticks: { color: '#949ba4' }, grid: { display: false } }
            }
        }
    });
</script>
"#;

fn render(title: &str, subtitle: &str, body: &str, scripts: &str, summary: &Value) -> String {
    let json_data = serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string());
    let scripts = scripts
        .replace("JSON_DATA_PLACEHOLDER", &json_data)
        .replace("COLOR_PALETTE", PALETTE);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
    <style>{STYLE}</style>
</head>
<body>
<div class="container">
    <header>
        <h1>{title}</h1>
        <div class="subtitle">{subtitle}</div>
    </header>
{body}
</div>
{scripts}
</body>
</html>
"#
    )
}

const CONVERSATION_BODY: &str = r#"
    <div class="stats">
        <div class="stat-card"><h3>Conversations</h3><div class="value" id="statConversations"></div></div>
        <div class="stat-card"><h3>Messages</h3><div class="value" id="statMessages"></div></div>
        <div class="stat-card"><h3>Est. Tokens</h3><div class="value" id="statTokens"></div></div>
        <div class="stat-card"><h3>Est. Cost</h3><div class="value" id="statCost"></div></div>
        <div class="stat-card"><h3>Est. Energy</h3><div class="value" id="statEnergy"></div>
            <div class="subvalue" id="statEnergySub"></div></div>
    </div>
    <div class="charts">
        <div class="card"><h2>Conversations by Topic</h2>
            <div class="chart-container"><canvas id="topicPieChart"></canvas></div></div>
        <div class="card"><h2>Messages by Topic</h2>
            <div class="chart-container"><canvas id="messagesBarChart"></canvas></div></div>
        <div class="card"><h2>Estimated Tokens by Topic</h2>
            <div class="chart-container"><canvas id="tokensBarChart"></canvas></div></div>
        <div class="card wide"><h2>Activity Timeline</h2>
            <div class="chart-container"><canvas id="timelineChart"></canvas></div></div>
    </div>
"#;

const PROJECT_BODY: &str = r#"
    <div class="stats">
        <div class="stat-card"><h3>Projects</h3><div class="value" id="statProjects"></div></div>
        <div class="stat-card"><h3>Sessions</h3><div class="value" id="statSessions"></div></div>
        <div class="stat-card"><h3>Total Tokens</h3><div class="value" id="statTokens"></div></div>
        <div class="stat-card"><h3>Est. Cost</h3><div class="value" id="statCost"></div></div>
        <div class="stat-card"><h3>Est. Energy</h3><div class="value" id="statEnergy"></div>
            <div class="subvalue" id="statEnergySub"></div></div>
    </div>
    <div class="charts">
        <div class="card"><h2>Token Share by Project</h2>
            <div class="chart-container"><canvas id="projectPieChart"></canvas></div></div>
        <div class="card"><h2>Token Types by Project</h2>
            <div class="chart-container"><canvas id="tokenTypesChart"></canvas></div></div>
        <div class="card"><h2>Energy by Project</h2>
            <div class="chart-container"><canvas id="energyChart"></canvas></div></div>
        <div class="card wide"><h2>Top Token Consumers</h2>
            <div class="chart-container"><canvas id="topConsumersChart"></canvas></div></div>
    </div>
"#;

/// Write the conversations-mode dashboard.
pub fn write_conversation_dashboard(summary: &Value, path: &Path) -> Result<()> {
    let html = render(
        "Conversation Topic Dashboard",
        "Topics, usage, and energy estimates from your conversation archive",
        CONVERSATION_BODY,
        CONVERSATION_SCRIPTS,
        summary,
    );
    fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "dashboard written");
    Ok(())
}

/// Write the projects-mode dashboard.
pub fn write_project_dashboard(summary: &Value, path: &Path) -> Result<()> {
    let html = render(
        "Claude Code Usage Dashboard",
        "Per-project token usage from session logs",
        PROJECT_BODY,
        PROJECT_SCRIPTS,
        summary,
    );
    fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "dashboard written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conversation_summary() -> Value {
        json!({
            "summary": {
                "total_conversations": 2, "total_messages": 5,
                "total_estimated_tokens": 100, "total_estimated_cost": 0.1,
                "energy": {"total_wh": 1.5, "equivalent_phone_charges": 0.125}
            },
            "by_topic": {"Rust": {"count": 2, "messages": 5, "estimated_tokens": 100}},
            "timeline": [{"date": "2024-06-01", "total": 2}],
            "conversations": []
        })
    }

    #[test]
    fn test_conversation_dashboard_embeds_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.html");
        write_conversation_dashboard(&conversation_summary(), &path).unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("topicPieChart"));
        assert!(html.contains("timelineChart"));
        assert!(html.contains(r#""total_conversations":2"#));
        assert!(!html.contains("JSON_DATA_PLACEHOLDER"));
        assert!(!html.contains("COLOR_PALETTE"));
    }

    #[test]
    fn test_project_dashboard_embeds_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.html");
        let summary = json!({
            "summary": {"total_projects": 1, "total_conversations": 1,
                        "tokens": {"total": 50}, "energy_wh": 0.5,
                        "phone_charges_equiv": 0.04, "cost_estimate": 0.01},
            "by_project": {}, "conversations": [], "top_consumers": []
        });
        write_project_dashboard(&summary, &path).unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("projectPieChart"));
        assert!(html.contains("topConsumersChart"));
        assert!(html.contains(r#""total_projects":1"#));
    }
}
