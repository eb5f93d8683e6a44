//! Generation of the long-lived Playwright driver script.

use crate::protocol::REPLY_MARKER;

/// Build the Node.js ES module that owns the browser for one job.
///
/// The script resolves `playwright` relative to its working directory (and
/// `NODE_PATH`), then serves commands from stdin until `close` or EOF.
pub fn build_driver_script() -> String {
    let mut script = String::new();
    script.push_str("import readline from 'node:readline';\n");
    script.push_str("import path from 'node:path';\n");
    script.push_str("import { createRequire } from 'node:module';\n\n");
    script.push_str(&format!("const REPLY_MARKER = '{}';\n", REPLY_MARKER));
    script.push_str("const emit = (reply) => {\n");
    script.push_str("  process.stdout.write(`${REPLY_MARKER}${JSON.stringify(reply)}\\n`);\n");
    script.push_str("};\n");
    script.push_str("const describe = (error) => (error && error.stack ? error.stack : String(error));\n\n");

    script.push_str("let chromium;\n");
    script.push_str("try {\n");
    script.push_str("  const require = createRequire(path.join(process.cwd(), 'castflow-driver.cjs'));\n");
    script.push_str("  ({ chromium } = require('playwright'));\n");
    script.push_str("} catch (error) {\n");
    script.push_str("  process.stderr.write(describe(error) + '\\n');\n");
    script.push_str("  emit({ id: 0, ok: false, kind: 'error', error: 'playwright package not found: ' + describe(error) });\n");
    script.push_str("  process.exit(1);\n");
    script.push_str("}\n\n");

    script.push_str("let browser = null;\n");
    script.push_str("let context = null;\n");
    script.push_str("let page = null;\n\n");

    script.push_str("const requirePage = () => {\n");
    script.push_str("  if (!page) throw new Error('browser not launched');\n");
    script.push_str("  return page;\n");
    script.push_str("};\n");
    script.push_str("const locate = (target) => requirePage().locator(target.selector).nth(target.nth ?? 0);\n\n");

    script.push_str("async function shutdown() {\n");
    script.push_str("  if (context) await context.close().catch(() => {});\n");
    script.push_str("  if (browser) await browser.close().catch(() => {});\n");
    script.push_str("  context = null;\n");
    script.push_str("  browser = null;\n");
    script.push_str("  page = null;\n");
    script.push_str("}\n\n");

    script.push_str("async function execute(command) {\n");
    script.push_str("  const timeout = command.timeout_ms ?? 10000;\n");
    script.push_str("  switch (command.type) {\n");
    script.push_str("    case 'launch': {\n");
    script.push_str("      browser = await chromium.launch({ headless: command.headless });\n");
    script.push_str("      const contextOptions = {};\n");
    script.push_str("      if (command.storage_state) contextOptions.storageState = command.storage_state;\n");
    script.push_str("      if (command.viewport) contextOptions.viewport = command.viewport;\n");
    script.push_str("      context = await browser.newContext(contextOptions);\n");
    script.push_str("      if (command.cookies && command.cookies.length > 0) {\n");
    script.push_str("        await context.addCookies(command.cookies);\n");
    script.push_str("      }\n");
    script.push_str("      page = await context.newPage();\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'goto': {\n");
    script.push_str("      await requirePage().goto(command.url, { waitUntil: command.wait_until ?? 'load', timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'wait_for_selector': {\n");
    script.push_str("      await requirePage().locator(command.selector).first().waitFor({ state: command.state ?? 'visible', timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'count':\n");
    script.push_str("      return await requirePage().locator(command.selector).count();\n");
    script.push_str("    case 'click': {\n");
    script.push_str("      await locate(command.target).click({ timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'fill': {\n");
    script.push_str("      await locate(command.target).fill(command.text, { timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'type': {\n");
    script.push_str("      const delay = command.delay_ms ?? 0;\n");
    script.push_str("      if (command.target) {\n");
    script.push_str("        await locate(command.target).pressSequentially(command.text, { delay, timeout });\n");
    script.push_str("      } else {\n");
    script.push_str("        await requirePage().keyboard.type(command.text, { delay });\n");
    script.push_str("      }\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'press': {\n");
    script.push_str("      if (command.target) {\n");
    script.push_str("        await locate(command.target).press(command.key, { timeout });\n");
    script.push_str("      } else {\n");
    script.push_str("        await requirePage().keyboard.press(command.key);\n");
    script.push_str("      }\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'check': {\n");
    script.push_str("      await locate(command.target).check({ timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'set_input_files': {\n");
    script.push_str("      await locate(command.target).setInputFiles(command.files, { timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'set_files_via_chooser': {\n");
    script.push_str("      const [chooser] = await Promise.all([\n");
    script.push_str("        requirePage().waitForEvent('filechooser', { timeout }),\n");
    script.push_str("        locate(command.trigger).click({ timeout }),\n");
    script.push_str("      ]);\n");
    script.push_str("      await chooser.setFiles(command.files);\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'dispatch_event': {\n");
    script.push_str("      await locate(command.target).dispatchEvent(command.event, { bubbles: true }, { timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'get_attribute':\n");
    script.push_str("      return await locate(command.target).getAttribute(command.name, { timeout });\n");
    script.push_str("    case 'inner_text':\n");
    script.push_str("      return await locate(command.target).innerText({ timeout });\n");
    script.push_str("    case 'is_visible':\n");
    script.push_str("      return await locate(command.target).isVisible();\n");
    script.push_str("    case 'scroll_into_view': {\n");
    script.push_str("      await locate(command.target).scrollIntoViewIfNeeded({ timeout });\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    case 'evaluate': {\n");
    script.push_str("      return await requirePage().evaluate(({ source, arg }) => {\n");
    script.push_str("        const fn = (0, eval)(`(${source})`);\n");
    script.push_str("        return typeof fn === 'function' ? fn(arg) : fn;\n");
    script.push_str("      }, { source: command.function, arg: command.arg ?? null });\n");
    script.push_str("    }\n");
    script.push_str("    case 'close': {\n");
    script.push_str("      await shutdown();\n");
    script.push_str("      return null;\n");
    script.push_str("    }\n");
    script.push_str("    default:\n");
    script.push_str("      throw new Error(`Unsupported command type: ${command.type}`);\n");
    script.push_str("  }\n");
    script.push_str("}\n\n");

    script.push_str("const input = readline.createInterface({ input: process.stdin, crlfDelay: Infinity });\n");
    script.push_str("for await (const line of input) {\n");
    script.push_str("  if (!line.trim()) continue;\n");
    script.push_str("  let command;\n");
    script.push_str("  try {\n");
    script.push_str("    command = JSON.parse(line);\n");
    script.push_str("  } catch (error) {\n");
    script.push_str("    emit({ id: 0, ok: false, kind: 'error', error: 'malformed command: ' + describe(error) });\n");
    script.push_str("    continue;\n");
    script.push_str("  }\n");
    script.push_str("  try {\n");
    script.push_str("    const value = await execute(command);\n");
    script.push_str("    emit({ id: command.id, ok: true, value: value ?? null });\n");
    script.push_str("  } catch (error) {\n");
    script.push_str("    const kind = error && error.name === 'TimeoutError' ? 'timeout' : 'error';\n");
    script.push_str("    emit({ id: command.id, ok: false, kind, error: describe(error) });\n");
    script.push_str("  }\n");
    script.push_str("  if (command.type === 'close') break;\n");
    script.push_str("}\n\n");
    script.push_str("await shutdown();\n");
    script.push_str("process.exit(0);\n");

    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_script_handles_every_command() {
        let script = build_driver_script();
        for case in [
            "case 'launch'",
            "case 'goto'",
            "case 'wait_for_selector'",
            "case 'count'",
            "case 'click'",
            "case 'fill'",
            "case 'type'",
            "case 'press'",
            "case 'check'",
            "case 'set_input_files'",
            "case 'set_files_via_chooser'",
            "case 'dispatch_event'",
            "case 'get_attribute'",
            "case 'inner_text'",
            "case 'is_visible'",
            "case 'scroll_into_view'",
            "case 'evaluate'",
            "case 'close'",
        ] {
            assert!(script.contains(case), "missing {case}");
        }
    }

    #[test]
    fn driver_script_tags_replies_with_marker() {
        let script = build_driver_script();
        assert!(script.contains(REPLY_MARKER));
        assert!(script.contains("TimeoutError"));
    }
}
