// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Page probes run in the browser through `execute/sync`.
//!
//! Selectors track the catalog's current markup. When the site changes,
//! this is the only file that should need editing.

/// `arguments[0]` is the marker name; returns a boolean.
pub const MARKER: &str = r#"
const marker = arguments[0];
const visible = el => !!el && el.offsetParent !== null;
if (marker === 'login_form') {
	return Array.from(document.querySelectorAll(
		'input[type="email"], input[placeholder*="mail"], input[name="email"]'
	)).some(visible);
}
if (marker === 'signed_in') {
	return document.querySelector('.user-avatar, .profile-icon, a[href*="/account"]') !== null;
}
if (marker === 'asset_grid') {
	return document.querySelectorAll(
		'.app-grid-icon img, .collection-icon img, img[src*="img.icons8.com"]'
	).length > 0;
}
return false;
"#;

/// Returns one of `challenge`, `no_access`, `guest`, `signed_in`, `unknown`.
pub const DETECT: &str = r#"
const body = document.body ? document.body.innerText : '';
const text = body.toLowerCase();
const visible = el => el.offsetParent !== null;
if (document.querySelector('iframe[src*="captcha"], iframe[src*="challenge"], #challenge-form, .cf-turnstile, .g-recaptcha, [data-sitekey]')
	|| document.title.toLowerCase().includes('just a moment')) {
	return 'challenge';
}
if (["you don't have access", 'access denied', 'this collection is private', 'no access to this collection']
	.some(phrase => text.includes(phrase))) {
	return 'no_access';
}
const guest = Array.from(document.querySelectorAll('a, button')).some(el => {
	const label = (el.innerText || '').trim().toLowerCase();
	return (label === 'sign in' || label === 'log in') && visible(el);
});
if (guest) {
	return 'guest';
}
if (document.querySelector('.user-avatar, .profile-icon, a[href*="/account"]') || body.includes('My collections')) {
	return 'signed_in';
}
return 'unknown';
"#;

/// `arguments` are the field name and value; returns false when the input
/// is missing. Uses the native setter so framework-bound inputs notice.
pub const FILL: &str = r#"
const [field, value] = arguments;
const selector = field === 'email'
	? 'input[type="email"], input[placeholder*="mail"], input[name="email"]'
	: 'input[type="password"]';
const input = document.querySelector(selector);
if (!input) {
	return false;
}
input.focus();
const setter = Object.getOwnPropertyDescriptor(HTMLInputElement.prototype, 'value').set;
setter.call(input, value);
input.dispatchEvent(new Event('input', { bubbles: true }));
input.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

/// Returns false when there is nothing to submit.
pub const SUBMIT: &str = r#"
for (const button of document.querySelectorAll('button')) {
	if (button.textContent.trim() === 'Log in' || button.classList.contains('i8-login-form__submit')) {
		button.click();
		return true;
	}
}
const form = document.querySelector('form');
if (!form) {
	return false;
}
if (form.requestSubmit) {
	form.requestSubmit();
} else {
	form.submit();
}
return true;
"#;

/// Rendered images inside the collection view, larger than 20px a side.
pub const EXTRACT: &str = r#"
const root = document.querySelector('.app-collection-view, .collection-grid, main') || document.body;
return Array.from(root.querySelectorAll('img'))
	.filter(img => {
		const rect = img.getBoundingClientRect();
		return rect.width > 20 && rect.height > 20;
	})
	.map(img => ({
		src: img.getAttribute('src'),
		srcset: img.getAttribute('srcset'),
		alt: img.getAttribute('alt'),
		inIconContainer: img.closest('.app-grid-icon, .collection-icon') !== null,
	}));
"#;

pub const LOAD_MORE: &str = r#"
window.scrollTo(0, document.body.scrollHeight);
const more = Array.from(document.querySelectorAll('button, a')).find(el => {
	const label = (el.innerText || '').trim().toLowerCase();
	return (label === 'load more' || label === 'show more') && el.offsetParent !== null;
});
if (more) {
	more.click();
	return true;
}
return false;
"#;

pub const READ_STATE: &str = r#"
const storage = {};
for (let i = 0; i < window.localStorage.length; i++) {
	const key = window.localStorage.key(i);
	storage[key] = window.localStorage.getItem(key);
}
return { userAgent: navigator.userAgent, localStorage: storage };
"#;

/// `arguments[0]` is an object of string entries.
pub const WRITE_STORAGE: &str = r#"
window.localStorage.clear();
for (const [key, value] of Object.entries(arguments[0])) {
	window.localStorage.setItem(key, value);
}
return true;
"#;
