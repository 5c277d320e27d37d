//! Server-rendered pages. Everything interpolated goes through [`escape`].

use std::fmt::Write;

use axum::response::Html;

use crate::auth::Flash;
use crate::models::Student;

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
.flash{padding:.5rem 1rem;margin:.5rem 0;border-radius:4px}\
.success{background:#e6f4ea}.error{background:#fce8e6}.info{background:#e8f0fe}\
table{border-collapse:collapse;width:100%}td,th{border-bottom:1px solid #ddd;padding:.4rem;text-align:left}";

const DASHBOARD_SCRIPT: &str = r#"
async function call(method, id, body) {
  const res = await fetch('/api/students/' + id, {
    method,
    headers: {'Content-Type': 'application/json'},
    body: body ? JSON.stringify(body) : undefined,
  });
  if (!res.ok) {
    const data = await res.json().catch(() => ({error: res.statusText}));
    alert(data.error);
    return;
  }
  location.reload();
}
function editStudent(id) {
  const row = document.getElementById('student-' + id);
  const name = prompt('Name', row.dataset.name);
  if (name === null) return;
  const age = prompt('Age', row.dataset.age);
  if (age === null) return;
  call('PUT', id, {name, age});
}
function deleteStudent(id) {
  if (confirm('Delete this student?')) call('DELETE', id);
}
"#;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    let mut notices = String::new();
    for flash in flashes {
        let _ = write!(
            notices,
            r#"<div class="flash {}">{}</div>"#,
            flash.kind.as_str(),
            escape(&flash.message)
        );
    }
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head>\
         <body>{}{}</body></html>",
        escape(title),
        STYLE,
        notices,
        body
    ))
}

pub fn login(flashes: &[Flash], error: Option<&str>) -> Html<String> {
    let mut all = flashes.to_vec();
    if let Some(error) = error {
        all.push(Flash::error(error));
    }
    layout(
        "Login",
        &all,
        r#"<h1>Student panel</h1>
<form method="post" action="/login">
<label>Username <input name="username" autocomplete="username" required></label>
<label>Password <input name="password" type="password" autocomplete="current-password" required></label>
<button type="submit">Log in</button>
</form>"#,
    )
}

pub fn dashboard(username: &str, students: &[Student], flashes: &[Flash]) -> Html<String> {
    let mut rows = String::new();
    for student in students {
        let _ = write!(
            rows,
            r#"<tr id="student-{id}" data-name="{name}" data-age="{age}"><td>{id}</td><td>{name}</td><td>{age}</td>
<td><button onclick="editStudent({id})">Edit</button> <button onclick="deleteStudent({id})">Delete</button></td></tr>"#,
            id = student.id,
            name = escape(&student.name),
            age = student.age
        );
    }
    if students.is_empty() {
        rows.push_str(r#"<tr><td colspan="4">No students yet.</td></tr>"#);
    }

    let body = format!(
        r#"<h1>Students</h1>
<p>Signed in as {user} &middot; <a href="/logout">Log out</a></p>
<form method="post" action="/students">
<input name="name" placeholder="Name" required>
<input name="age" type="number" min="1" placeholder="Age" required>
<button type="submit">Add student</button>
</form>
<table><thead><tr><th>ID</th><th>Name</th><th>Age</th><th></th></tr></thead><tbody>{rows}</tbody></table>
<script>{script}</script>"#,
        user = escape(username),
        rows = rows,
        script = DASHBOARD_SCRIPT
    );
    layout("Dashboard", flashes, &body)
}

pub fn error(message: &str) -> Html<String> {
    layout(
        "Error",
        &[],
        &format!(
            r#"<h1>{}</h1><p><a href="/">Back to the panel</a></p>"#,
            escape(message)
        ),
    )
}
