// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PÁGINA DO FORMULÁRIO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Um campo de texto, um botão de pesquisa e um botão opcional de
// esclarecimento. O script lê o SSE de `POST /api/research` via fetch
// (EventSource não suporta POST) e renderiza:
// - status em uma área de texto
// - resumo curto
// - relatório em HTML (renderizado no servidor)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HTML completo servido em `GET /`
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Deep Research</title>
<style>
  body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; max-width: 860px; margin: 32px auto; padding: 0 16px; color: #1f2328; }
  h1 { font-size: 1.6em; }
  form { display: flex; gap: 8px; }
  #query { flex: 1; padding: 8px; font-size: 1em; }
  button { padding: 8px 16px; font-size: 1em; cursor: pointer; }
  button:disabled { cursor: wait; opacity: .6; }
  #questions label { display: block; margin-top: 8px; font-weight: 600; }
  #questions input { width: 100%; padding: 6px; }
  #status { width: 100%; height: 140px; margin-top: 16px; font-family: monospace; font-size: .85em; }
  #summary { background: #f6f8fa; border-left: 4px solid #0969da; padding: 8px 12px; margin-top: 16px; }
  #summary:empty { display: none; }
  #report table { border-collapse: collapse; }
  #report th, #report td { border: 1px solid #d0d7de; padding: 6px 12px; }
  #report pre { background: #f6f8fa; padding: 12px; overflow: auto; }
  .warning { color: #9a6700; }
  .error { color: #cf222e; }
</style>
</head>
<body>
<h1>Deep Research</h1>
<form id="form">
  <input id="query" name="query" placeholder="What topic would you like to research?" autocomplete="off">
  <button id="clarify" type="button">Clarify</button>
  <button id="run" type="submit">Run</button>
</form>
<div id="questions"></div>
<textarea id="status" readonly></textarea>
<p id="notice"></p>
<div id="summary"></div>
<div id="report"></div>
<script>
const $ = (id) => document.getElementById(id);
let pendingQuestions = [];

function setBusy(busy) {
  $("run").disabled = busy;
  $("clarify").disabled = busy;
}

function notice(text, cls) {
  $("notice").textContent = text;
  $("notice").className = cls || "";
}

function appendStatus(line) {
  $("status").value += line + "\n";
  $("status").scrollTop = $("status").scrollHeight;
}

function handleEvent(event) {
  switch (event.type) {
    case "status": appendStatus(event.message); break;
    case "warning": appendStatus("Warning: " + event.message); notice(event.message, "warning"); break;
    case "summary": $("summary").textContent = event.text; break;
    case "report": $("report").innerHTML = event.html; break;
    case "error": notice(event.stage + ": " + event.message, "error"); break;
    case "finished": appendStatus("Run " + event.run_id + " finished: " + event.state.state); break;
  }
}

async function clarify() {
  const query = $("query").value.trim();
  if (!query) return;
  setBusy(true);
  notice("");
  try {
    const response = await fetch("/api/clarify", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ query }),
    });
    const body = await response.json();
    if (!response.ok) { notice(body.error.message, "error"); return; }
    pendingQuestions = body.questions;
    $("questions").innerHTML = "";
    pendingQuestions.forEach((q, i) => {
      const label = document.createElement("label");
      label.textContent = q;
      const input = document.createElement("input");
      input.id = "answer-" + i;
      $("questions").append(label, input);
    });
  } finally {
    setBusy(false);
  }
}

async function run(e) {
  e.preventDefault();
  const query = $("query").value.trim();
  if (!query) { notice("Please enter a query.", "error"); return; }
  const clarifications = pendingQuestions.map((question, i) => ({
    question,
    answer: ($("answer-" + i) || {}).value || "",
  }));

  setBusy(true);
  notice("");
  $("status").value = "";
  $("summary").textContent = "";
  $("report").innerHTML = "";

  try {
    const response = await fetch("/api/research", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ query, clarifications, stream: true }),
    });
    if (!response.ok) {
      const body = await response.json();
      notice(body.error.message, "error");
      return;
    }
    const reader = response.body.getReader();
    const decoder = new TextDecoder();
    let buffer = "";
    for (;;) {
      const { value, done } = await reader.read();
      if (done) break;
      buffer += decoder.decode(value, { stream: true });
      let split;
      while ((split = buffer.indexOf("\n\n")) >= 0) {
        const chunk = buffer.slice(0, split);
        buffer = buffer.slice(split + 2);
        const data = chunk.split("\n").filter((l) => l.startsWith("data:")).map((l) => l.slice(5).trim()).join("");
        if (data) handleEvent(JSON.parse(data));
      }
    }
  } catch (err) {
    notice(String(err), "error");
  } finally {
    setBusy(false);
  }
}

$("form").addEventListener("submit", run);
$("clarify").addEventListener("click", clarify);
</script>
</body>
</html>
"##;
