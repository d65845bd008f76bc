//! Wrapper project templates.
//!
//! The project sources are fixed. Per-deployment values live in
//! `public/wrapper.config.json`, which `main.js` fetches at start-up.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// Generated constants for one wrapper deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperConfig {
    pub base_id: String,
    pub title: String,
    pub gateway: String,
    pub navigation_delay_ms: u64,
}

impl WrapperConfig {
    pub fn new(base_id: &str, title: &str, gateway: &str, delay: Duration) -> Self {
        Self {
            base_id: base_id.to_string(),
            title: title.to_string(),
            gateway: gateway.to_string(),
            navigation_delay_ms: delay.as_millis() as u64,
        }
    }
}

pub const CONFIG_FILE: &str = "public/wrapper.config.json";

pub const PACKAGE_JSON: &str = r#"{
  "name": "evolutionary-app-wrapper",
  "private": true,
  "version": "0.0.0",
  "type": "module",
  "scripts": {
    "build": "vite build"
  },
  "dependencies": {
    "@permaweb/asset-graph": "https://arweave.net/-jYaU7HYX3JNpsOTqkMzEKUK4_5Mfy-a88jtgSNrI_k",
    "@permaweb/stampjs": "0.0.15",
    "arweave": "1.12.4",
    "warp-contracts": "1.2.39"
  },
  "devDependencies": {
    "vite": "^4.3.2"
  }
}
"#;

pub const VITE_CONFIG: &str = r#"import { defineConfig } from 'vite';

export default defineConfig({
  base: '',
});
"#;

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Loading app</title>
    <style>
      :root {
        font-family: Inter, system-ui, Helvetica, Arial, sans-serif;
        color-scheme: light dark;
        background-color: hsl(200, 7%, 8.8%);
      }
      .spinner {
        position: absolute;
        top: 50%;
        left: 50%;
        width: 40px;
        height: 40px;
        margin: -20px 0 0 -20px;
        border: 3px solid hsla(226, 70%, 55.5%, 0.3);
        border-top-color: hsl(226, 70%, 55.5%);
        border-radius: 50%;
        animation: spin 1s linear infinite;
      }
      @keyframes spin {
        to { transform: rotate(360deg); }
      }
    </style>
  </head>
  <body>
    <div class="spinner"></div>
    <script>
      if (typeof global === 'undefined') {
        window.global = window;
        global.crypto = window.crypto;
      }
    </script>
    <script type="module" src="/main.js"></script>
  </body>
</html>
"#;

pub const MAIN_JS: &str = r#"import graph from '@permaweb/asset-graph';
import Stamps from '@permaweb/stampjs';
import { WarpFactory, LoggerFactory } from 'warp-contracts';
import Arweave from 'arweave';

const ABORT_BASE = 'https://evolutionary.g8way.io/';

const arweave = Arweave.init({});
const warp = WarpFactory.forMainnet();
LoggerFactory.INST.logLevel('none');
const stamps = Stamps.init({ warp });

// pending | fired | cancelled
let navigation = { state: 'pending', timer: null };
let wrapperTx = null;
let config = null;

async function loadConfig() {
  const res = await fetch('./wrapper.config.json');
  return res.json();
}

async function latestWrapper(baseId) {
  const query = `query ($txid: String!) {
    transactions(tags: [
      { name: "Content-Type", values: ["application/x.arweave-manifest+json"] },
      { name: "Data-Protocol", values: ["Evoapps"] },
      { name: "Wrapper-For", values: [$txid] }
    ]) { edges { node { id } } }
  }`;
  const res = await arweave.api.post('/graphql', { query, variables: { txid: baseId } });
  const edges = res.data.data.transactions.edges;
  return edges.length ? edges[edges.length - 1].node.id : null;
}

function flatten(node, out = []) {
  out.push(node.id);
  (node.children || []).forEach((child) => flatten(child, out));
  return out;
}

function select(ids, counts) {
  if (ids.length === 0) return null;
  const count = (id) => (counts[id] && counts[id].vouched) || 0;
  const bestCount = Math.max(...ids.map(count));
  // Nothing vouched: the base version.
  if (bestCount === 0) return ids[0];
  return ids.find((id) => count(id) === bestCount);
}

async function resolve(baseId) {
  const tree = await graph(baseId);
  const ids = flatten(tree);
  const counts = await stamps.counts(ids);
  return select(ids, counts);
}

function schedule(url, delay) {
  navigation.timer = setTimeout(() => {
    if (navigation.state !== 'pending') return;
    navigation.state = 'fired';
    location.href = url;
  }, delay);
}

function abort() {
  if (navigation.state !== 'pending') return;
  navigation.state = 'cancelled';
  clearTimeout(navigation.timer);
  const target = wrapperTx
    ? `${ABORT_BASE}#/app?tx=${wrapperTx}&baseId=${config.baseId}`
    : ABORT_BASE;
  window.location.replace(target);
}

window.addEventListener('keydown', (event) => {
  if (event.key === 'Escape') abort();
});

window.addEventListener('load', async () => {
  config = await loadConfig();
  document.title = config.title;
  try {
    wrapperTx = await latestWrapper(config.baseId);
  } catch (error) {
    console.error(error);
  }
  let target = config.baseId;
  try {
    target = (await resolve(config.baseId)) || config.baseId;
  } catch (error) {
    console.error(error);
  }
  if (navigation.state === 'pending') {
    schedule(config.gateway + target, config.navigationDelayMs);
  }
});
"#;

/// Writes the wrapper project into `dir`.
pub fn write_project(dir: &Path, config: &WrapperConfig) -> Result<(), PublishError> {
    std::fs::write(dir.join("package.json"), PACKAGE_JSON)?;
    std::fs::write(dir.join("vite.config.js"), VITE_CONFIG)?;
    std::fs::write(dir.join("index.html"), INDEX_HTML)?;
    std::fs::write(dir.join("main.js"), MAIN_JS)?;

    let config_path = dir.join(CONFIG_FILE);
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}
