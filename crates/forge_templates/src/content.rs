//! Raw template text for generated TypeScript projects.

use crate::renderer::FileTemplate;

pub const PACKAGE_JSON: &str = r#"{
  "name": "{{name}}",
  "version": "0.1.0",
  "description": "{{description_json}}",
  "type": "module",
  "main": "dist/index.js",
  "types": "dist/index.d.ts",
  "scripts": {
    "build": "tsc -p tsconfig.json",
    "typecheck": "tsc --noEmit",
    "lint": "eslint src --ext .ts",
    "test": "vitest run",
    "start": "node dist/index.js"
  },
  "dependencies": {{dependencies_json}},
  "devDependencies": {
    "@types/node": "^20.11.0",
    "@typescript-eslint/eslint-plugin": "^7.0.0",
    "@typescript-eslint/parser": "^7.0.0",
    "eslint": "^8.56.0",
    "typescript": "^5.3.3",
    "vitest": "^1.2.0"
  }
}
"#;

pub const TSCONFIG_JSON: &str = r#"{
  "compilerOptions": {
    "target": "ES2022",
    "module": "ESNext",
    "moduleResolution": "Bundler",
    "declaration": true,
    "outDir": "dist",
    "rootDir": "src",
    "strict": true,
    "esModuleInterop": true,
    "skipLibCheck": true
  },
  "include": ["src/**/*.ts"],
  "exclude": ["node_modules", "dist", "tests"]
}
"#;

pub const ESLINTRC_JSON: &str = r#"{
  "root": true,
  "parser": "@typescript-eslint/parser",
  "plugins": ["@typescript-eslint"],
  "extends": ["eslint:recommended", "plugin:@typescript-eslint/recommended"],
  "env": { "node": true, "es2022": true },
  "ignorePatterns": ["dist", "node_modules"]
}
"#;

pub const GITIGNORE: &str = "node_modules/\ndist/\ncoverage/\n.env\n*.log\n";

pub const README_MD: &str = r#"# {{name_pascal}}

{{description}}

Target: `{{target}}`

## Setup

```bash
npm install
cp .env.example .env
npm run build
npm test
```

## Environment

{{env_table}}
"#;

pub const ENV_EXAMPLE: &str = "# Environment for {{name}}\n{{env_lines}}";

pub const TYPES_TS: &str = r#"export interface Capability {
  name: string;
  description: string;
}

export interface ActionContext {
  input: string;
  env: Record<string, string | undefined>;
}

export interface ActionResult {
  success: boolean;
  text: string;
  data?: unknown;
}

export interface Action extends Capability {
  handler(context: ActionContext): Promise<ActionResult>;
}
"#;

pub const PLUGIN_INDEX_TS: &str = r#"import { actions } from "./actions/index.js";
import { providers } from "./providers/index.js";
import { services } from "./services/index.js";
import { evaluators } from "./evaluators/index.js";

export const {{name_camel}}Plugin = {
  name: "{{name}}",
  description: "{{description_json}}",
  actions,
  providers,
  services,
  evaluators,
};

export default {{name_camel}}Plugin;
"#;

pub const PLUGIN_ACTIONS_TS: &str = r#"import type { Action } from "../types.js";

export const actions: Action[] = [];
"#;

pub const PLUGIN_PROVIDERS_TS: &str = r#"import type { Capability } from "../types.js";

export const providers: Capability[] = [];
"#;

pub const PLUGIN_SERVICES_TS: &str = r#"import type { Capability } from "../types.js";

export const services: Capability[] = [];
"#;

pub const PLUGIN_EVALUATORS_TS: &str = r#"import type { Capability } from "../types.js";

export const evaluators: Capability[] = [];
"#;

pub const AGENT_INDEX_TS: &str = r#"import { character } from "./character.js";

export function describe(): string {
  return `${character.name}: ${character.bio}`;
}

export { character };
export default character;
"#;

pub const AGENT_CHARACTER_TS: &str = r#"export const character = {
  name: "{{name_pascal}}",
  bio: "{{description_json}}",
  style: ["concise", "helpful"],
  plugins: [] as string[],
};
"#;

pub const WORKFLOW_INDEX_TS: &str = r#"import { steps } from "./steps/index.js";

export async function run(input: string): Promise<string> {
  let value = input;
  for (const step of steps) {
    value = await step.run(value);
  }
  return value;
}

export default run;
"#;

pub const WORKFLOW_STEPS_TS: &str = r#"export interface Step {
  name: string;
  run(input: string): Promise<string>;
}

export const steps: Step[] = [];
"#;

pub const INTEGRATION_INDEX_TS: &str = r#"export { createClient } from "./client.js";
export type { ClientOptions } from "./client.js";
"#;

pub const INTEGRATION_CLIENT_TS: &str = r#"export interface ClientOptions {
  baseUrl: string;
  apiKey?: string;
}

export function createClient(options: ClientOptions) {
  async function request<T>(path: string, init: RequestInit = {}): Promise<T> {
    const headers: Record<string, string> = { "Content-Type": "application/json" };
    if (options.apiKey) {
      headers["Authorization"] = `Bearer ${options.apiKey}`;
    }
    const response = await fetch(`${options.baseUrl}${path}`, { ...init, headers });
    if (!response.ok) {
      throw new Error(`Request failed with status ${response.status}`);
    }
    return (await response.json()) as T;
  }

  return { request };
}
"#;

pub const FULLSTACK_INDEX_TS: &str = r#"import { createServer } from "./server.js";

const port = Number(process.env.PORT ?? 3000);
createServer().listen(port, () => {
  console.log(`{{name}} listening on ${port}`);
});
"#;

pub const FULLSTACK_SERVER_TS: &str = r#"import http from "node:http";

export function createServer() {
  return http.createServer((req, res) => {
    if (req.url === "/health") {
      res.writeHead(200, { "Content-Type": "application/json" });
      res.end(JSON.stringify({ status: "ok" }));
      return;
    }
    res.writeHead(404);
    res.end();
  });
}
"#;

pub const FULLSTACK_CLIENT_TS: &str = r#"export async function health(baseUrl: string): Promise<boolean> {
  const response = await fetch(`${baseUrl}/health`);
  return response.ok;
}
"#;

pub const CHUNKED_INDEX_TS: &str = r#"import type { Action, ActionContext, ActionResult } from "./types.js";

const REQUIRED_ENV = {{required_env_json}};

export function missingEnv(env: Record<string, string | undefined> = process.env): string[] {
  return REQUIRED_ENV.filter((name) => !env[name]);
}

{{action_stubs}}
export const actions: Action[] = [{{action_list}}];

export const {{name_camel}} = {
  name: "{{name}}",
  description: "{{description_json}}",
  actions,
};

export default {{name_camel}};
"#;

pub const ACTION_STUB_TS: &str = r#"export const {{action_camel}}: Action = {
  name: "{{action_name}}",
  description: "{{action_description}}",
  async handler(context: ActionContext): Promise<ActionResult> {
    return { success: true, text: `{{action_name}} received: ${context.input}` };
  },
};
"#;

pub const SMOKE_TEST_TS: &str = r#"import { describe, expect, it } from "vitest";
import project, { actions } from "../src/index.js";

describe("{{name}}", () => {
  it("exports its metadata", () => {
    expect(project.name).toBe("{{name}}");
  });

  it("registers {{action_count}} action(s)", () => {
    expect(actions.length).toBe({{action_count}});
  });
});
"#;

pub const DOCKERFILE: &str = r#"FROM node:20-slim AS build
WORKDIR /app
COPY package*.json ./
RUN npm install
COPY . .
RUN npm run build

FROM node:20-slim
WORKDIR /app
ENV NODE_ENV=production
COPY --from=build /app/package*.json ./
RUN npm install --omit=dev
COPY --from=build /app/dist ./dist
CMD ["node", "dist/index.js"]
"#;

/// Files every project target receives.
pub const SHARED_FILES: &[FileTemplate] = &[
    FileTemplate::new("package.json", PACKAGE_JSON),
    FileTemplate::new("tsconfig.json", TSCONFIG_JSON),
    FileTemplate::new(".eslintrc.json", ESLINTRC_JSON),
    FileTemplate::new(".gitignore", GITIGNORE),
    FileTemplate::new("README.md", README_MD),
    FileTemplate::new(".env.example", ENV_EXAMPLE),
    FileTemplate::new("src/types.ts", TYPES_TS),
];
