use conta_comigo::error::AppError;
use conta_comigo::vacancies::{FilterState, OriginState, Profession, ResultRow, VacancySearchView};
use std::fmt::Write;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

/// Full dashboard page for one interaction.
pub(crate) fn render(filter: &FilterState, view: &VacancySearchView, source_url: &str) -> String {
    let mut body = render_intro(source_url);
    body.push_str(&render_form(filter, view));
    body.push_str(&render_origin(filter, view));

    let _ = write!(
        body,
        "<p class=\"count\">{} município(s) com vagas de {}</p>",
        view.result_count,
        escape_html(view.profession_label)
    );
    let _ = write!(
        body,
        "<div id=\"map\"></div>\n<script>const points = {};</script>\n{}",
        points_json(view),
        MAP_SCRIPT
    );

    if let Some(rows) = &view.table {
        body.push_str(&render_table(view.profession_label, rows));
    }

    let summary = &view.load_summary;
    let _ = write!(
        body,
        "<footer>Dados carregados em {} UTC: {} município(s) com vagas, {} sem cadastro IBGE, \
         {} sem coordenadas, {} correção(ões) aplicada(s).</footer>",
        view.loaded_at.format("%d/%m/%Y %H:%M"),
        summary.listings,
        summary.without_registry_match,
        summary.without_coordinates,
        summary.corrections_applied
    );

    page("Brasil Conta Comigo: vagas por distância", true, &body)
}

/// Shown instead of the dashboard when the sources could not be loaded.
pub(crate) fn render_unavailable(error: &AppError) -> String {
    let body = format!(
        "<p class=\"error\">Não foi possível carregar os dados das vagas.</p>\
         <p><code>{}</code></p><p>Tente novamente em instantes.</p>",
        escape_html(&error.to_string())
    );
    page("Dados indisponíveis", false, &body)
}

fn page(title: &str, with_map: bool, body: &str) -> String {
    let map_assets = if with_map {
        format!(
            "<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\">\n<script src=\"{LEAFLET_JS}\"></script>\n"
        )
    } else {
        String::new()
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n{map_assets}<style>{STYLE}</style>\n</head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn render_intro(source_url: &str) -> String {
    format!(
        "<p class=\"intro\">Aplicação para ajudar você a achar a cidade mais próxima com vagas \
         no programa Brasil Conta Comigo. Os dados vêm da lista de vagas do \
         <a href=\"{}\">ApoiaSUS</a>.</p>\
         <p class=\"hint\">Filtre pela sua profissão de interesse e, informando sua cidade, \
         pela distância máxima até ela.</p>",
        escape_html(source_url)
    )
}

fn render_form(filter: &FilterState, view: &VacancySearchView) -> String {
    let mut form = String::from("<form method=\"get\" action=\"/\">");
    let _ = write!(
        form,
        "<label>Cidade <input type=\"text\" name=\"city\" value=\"{}\"></label>\
         <label>UF <input type=\"text\" name=\"state\" maxlength=\"2\" size=\"2\" value=\"{}\"></label>",
        escape_html(filter.city.as_deref().unwrap_or_default()),
        escape_html(filter.state.as_deref().unwrap_or_default())
    );

    form.push_str("<label>Profissão <select name=\"profession\">");
    for profession in Profession::ordered() {
        let selected = if profession == view.profession {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            form,
            "<option value=\"{}\"{selected}>{}</option>",
            profession.slug(),
            escape_html(profession.label())
        );
    }
    form.push_str("</select></label>");

    if let (Some(bounds), Some(km)) = (view.distance_bounds, view.max_distance_km) {
        let _ = write!(
            form,
            "<label>Distância máxima: <output id=\"max-distance-value\">{km}</output> km \
             <input type=\"range\" name=\"max_distance\" min=\"{}\" max=\"{}\" step=\"1\" value=\"{km}\" \
             oninput=\"document.getElementById('max-distance-value').value = this.value\"></label>",
            bounds.min_km, bounds.max_km
        );
    }

    let checked = if filter.show_table { " checked" } else { "" };
    let _ = write!(
        form,
        "<label><input type=\"checkbox\" name=\"show_table\"{checked}> Mostrar tabela</label>\
         <button type=\"submit\">Buscar</button></form>"
    );
    form
}

fn render_origin(filter: &FilterState, view: &VacancySearchView) -> String {
    match view.origin.status {
        OriginState::NotSet => "<p class=\"hint\">Informe cidade e UF para ordenar por distância.</p>"
            .to_string(),
        OriginState::Resolved => match filter.origin_query() {
            Some((city, state)) => format!(
                "<p class=\"origin\">Distâncias a partir de {} ({}).</p>",
                escape_html(city),
                escape_html(&state.to_uppercase())
            ),
            None => String::new(),
        },
        OriginState::NotFound => format!(
            "<p class=\"error\">{}</p>",
            escape_html(view.origin.message.as_deref().unwrap_or_default())
        ),
    }
}

fn render_table(profession_label: &str, rows: &[ResultRow]) -> String {
    let mut table = format!(
        "<table><thead><tr><th>UF</th><th>Município</th><th>{}</th><th>ibgeID</th>\
         <th>Distância (km)</th></tr></thead><tbody>",
        escape_html(profession_label)
    );
    for row in rows {
        let distance = row
            .distance_km
            .map(|km| format!("{km:.1}"))
            .unwrap_or_default();
        let _ = write!(
            table,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{distance}</td></tr>",
            escape_html(&row.state_code),
            escape_html(&row.city_name),
            row.openings,
            escape_html(row.ibge_id.as_str())
        );
    }
    table.push_str("</tbody></table>");
    table
}

/// Map markers as a JSON literal safe to embed in a `<script>` element.
fn points_json(view: &VacancySearchView) -> String {
    serde_json::to_string(&view.points)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const MAP_SCRIPT: &str = r#"<script>
const map = L.map('map').setView([-14.235, -51.925], 4);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  maxZoom: 18,
  attribution: '&copy; OpenStreetMap'
}).addTo(map);
const markers = points.map(p => L.circleMarker([p.latitude, p.longitude], { radius: 6 })
  .bindTooltip(p.label + ': ' + p.openings + ' vaga(s)'));
if (markers.length > 0) {
  const group = L.featureGroup(markers).addTo(map);
  map.fitBounds(group.getBounds(), { maxZoom: 10, padding: [20, 20] });
}
</script>"#;

const STYLE: &str = "body{font-family:sans-serif;margin:1.5rem;}\
form{display:flex;flex-wrap:wrap;gap:1rem;align-items:end;margin-bottom:1rem;}\
#map{height:480px;margin:1rem 0;}\
table{border-collapse:collapse;}th,td{border:1px solid #ccc;padding:.25rem .5rem;}\
.error{color:#b00020;}footer{margin-top:1rem;color:#555;font-size:.9rem;}";
