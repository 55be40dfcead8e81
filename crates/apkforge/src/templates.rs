//! Native project templates
//!
//! Renders the manifest, the WebView entry activity, its layout and the
//! string resources. Rendering is a pure function of [`BuildConfig`] and
//! the icon step's outcome; writing is a separate step.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::{BuildError, IoResultExt, Result};
use crate::icons::IconOutcome;
use crate::scaffold::ProjectScaffold;

/// URL the entry activity loads on start
pub const ENTRY_URL: &str = "file:///android_asset/index.html";

/// All rendered template files for one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplates {
    pub manifest: String,
    pub main_activity: String,
    pub layout: String,
    pub strings: String,
}

/// Payload returned by the `Android.getAppInfo()` bridge call
#[derive(Serialize)]
struct AppInfo<'a> {
    #[serde(rename = "appName")]
    app_name: &'a str,
    version: &'a str,
    package: &'a str,
}

/// Render every template
pub fn render(config: &BuildConfig, icons: IconOutcome) -> Result<RenderedTemplates> {
    Ok(RenderedTemplates {
        manifest: render_manifest(config, icons.wrote_icons()),
        main_activity: render_main_activity(config)?,
        layout: render_layout(),
        strings: render_strings(config),
    })
}

/// Render and write every template into the scaffold
pub fn write_templates(
    scaffold: &ProjectScaffold,
    config: &BuildConfig,
    icons: IconOutcome,
) -> Result<RenderedTemplates> {
    let rendered = render(config, icons)?;

    let files = [
        (scaffold.manifest_path(), &rendered.manifest),
        (scaffold.source_dir().join("MainActivity.java"), &rendered.main_activity),
        (scaffold.layout_dir().join("activity_main.xml"), &rendered.layout),
        (scaffold.values_dir().join("strings.xml"), &rendered.strings),
    ];
    for (path, content) in files {
        write_file(&path, content)?;
    }

    info!("Templates rendered for {}", config.package_name);
    Ok(rendered)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_path("write", path)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Generate AndroidManifest.xml content
///
/// The launcher icon is only declared when `with_icon` is set; aapt2 rejects
/// a reference to a drawable that was never written.
pub fn render_manifest(config: &BuildConfig, with_icon: bool) -> String {
    let icon_attr = if with_icon {
        "\n        android:icon=\"@drawable/ic_launcher\""
    } else {
        ""
    };

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="{package}"
    android:versionCode="{version_code}"
    android:versionName="{version_name}">

    <uses-sdk
        android:minSdkVersion="{min_sdk}"
        android:targetSdkVersion="{target_sdk}" />

    <uses-permission android:name="android.permission.INTERNET"/>
    <uses-permission android:name="android.permission.ACCESS_NETWORK_STATE"/>
    <uses-permission android:name="android.permission.WRITE_EXTERNAL_STORAGE" android:maxSdkVersion="28"/>
    <uses-permission android:name="android.permission.READ_EXTERNAL_STORAGE" android:maxSdkVersion="28"/>

    <application
        android:allowBackup="true"{icon_attr}
        android:label="@string/app_name"
        android:usesCleartextTraffic="true"
        android:theme="@android:style/Theme.DeviceDefault.Light">

        <activity
            android:name=".MainActivity"
            android:label="@string/app_name"
            android:configChanges="orientation|screenSize|keyboardHidden"
            android:exported="true"
            android:hardwareAccelerated="true">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
                <category android:name="android.intent.category.LAUNCHER"/>
            </intent-filter>
        </activity>
    </application>
</manifest>
"#,
        package = xml_escape(&config.package_name),
        version_code = config.version_code,
        version_name = xml_escape(&config.version_name),
        min_sdk = config.min_sdk,
        target_sdk = config.target_sdk,
        icon_attr = icon_attr,
    )
}

/// Generate MainActivity.java content
pub fn render_main_activity(config: &BuildConfig) -> Result<String> {
    let info = AppInfo {
        app_name: &config.app_name,
        version: &config.version_name,
        package: &config.package_name,
    };
    let info_json = serde_json::to_string(&info)
        .map_err(|e| BuildError::config(format!("Failed to encode app info: {}", e)))?;

    Ok(format!(
        r#"package {package};

import android.app.Activity;
import android.os.Build;
import android.os.Bundle;
import android.webkit.JavascriptInterface;
import android.webkit.WebChromeClient;
import android.webkit.WebSettings;
import android.webkit.WebView;
import android.webkit.WebViewClient;
import android.widget.Toast;

public class MainActivity extends Activity {{
    private WebView webView;

    @Override
    protected void onCreate(Bundle savedInstanceState) {{
        super.onCreate(savedInstanceState);
        setContentView(R.layout.activity_main);

        webView = findViewById(R.id.webview);
        setupWebView();

        webView.loadUrl("{entry_url}");
    }}

    private void setupWebView() {{
        WebSettings settings = webView.getSettings();
        settings.setJavaScriptEnabled(true);
        settings.setDomStorageEnabled(true);
        settings.setAllowFileAccess(true);
        settings.setAllowContentAccess(true);
        settings.setDatabaseEnabled(true);
        settings.setLoadWithOverviewMode(true);
        settings.setUseWideViewPort(true);
        settings.setSupportZoom(true);
        settings.setBuiltInZoomControls(true);
        settings.setDisplayZoomControls(false);

        if (Build.VERSION.SDK_INT >= Build.VERSION_CODES.LOLLIPOP) {{
            settings.setMixedContentMode(WebSettings.MIXED_CONTENT_ALWAYS_ALLOW);
        }}

        webView.setWebViewClient(new WebViewClient());
        webView.setWebChromeClient(new WebChromeClient());
        webView.addJavascriptInterface(new WebAppInterface(), "Android");
    }}

    @Override
    public void onBackPressed() {{
        if (webView.canGoBack()) {{
            webView.goBack();
        }} else {{
            super.onBackPressed();
        }}
    }}

    public class WebAppInterface {{
        @JavascriptInterface
        public void showToast(String message) {{
            Toast.makeText(MainActivity.this, message, Toast.LENGTH_SHORT).show();
        }}

        @JavascriptInterface
        public String getAppInfo() {{
            return "{app_info}";
        }}
    }}
}}
"#,
        package = config.package_name,
        entry_url = ENTRY_URL,
        app_info = java_escape(&info_json),
    ))
}

/// Generate res/layout/activity_main.xml content
pub fn render_layout() -> String {
    r##"<?xml version="1.0" encoding="utf-8"?>
<RelativeLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent"
    android:background="#FFFFFF">

    <WebView
        android:id="@+id/webview"
        android:layout_width="match_parent"
        android:layout_height="match_parent" />

</RelativeLayout>
"##
    .to_string()
}

/// Generate res/values/strings.xml content
pub fn render_strings(config: &BuildConfig) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="app_name">{}</string>
</resources>
"#,
        xml_escape(&config.app_name)
    )
}

/// Escape text for XML attribute values and element content
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for the inside of a Java string literal
pub fn java_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
